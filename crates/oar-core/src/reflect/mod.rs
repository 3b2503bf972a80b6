//! The reflection engine.
//!
//! [`Reflector`] owns a [`Document`] and fills it from request and response
//! types. Each call is all-or-nothing: when it fails, neither the document
//! nor the target [`Operation`] is changed.

pub mod assembler;
pub mod classifier;
pub mod naming;
pub mod registry;
pub mod synthesizer;
pub mod walker;

use indexmap::IndexMap;
use log::debug;

use crate::config::ReflectorConfig;
use crate::document::{Document, HttpMethod, Operation, SchemaOrRef};
use crate::error::Result;
use crate::types::TypeHandle;

pub use assembler::RequestParts;
pub use classifier::Location;
pub use registry::{EntryState, Registry, RegistryEntry, TypeMapping};
pub use synthesizer::Synthesizer;
pub use walker::FieldDescriptor;

/// Reflects types into the operations and components of one document.
#[derive(Debug, Default)]
pub struct Reflector {
    config: ReflectorConfig,
    document: Document,
}

impl Reflector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReflectorConfig) -> Self {
        Self {
            config,
            document: Document::new(),
        }
    }

    pub fn config(&self) -> &ReflectorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Override how `source` is described wherever it appears.
    ///
    /// A [`TypeMapping::Schema`] is used verbatim and inlined. A
    /// [`TypeMapping::Type`] describes another type instead; when `source` is
    /// an interface this is its concrete implementation.
    pub fn add_type_mapping(&mut self, source: TypeHandle, mapping: impl Into<TypeMapping>) {
        self.document
            .registry
            .add_type_mapping(source, mapping.into());
    }

    /// Schema node for `ty`, registering any components it needs.
    pub fn synthesize(&mut self, ty: TypeHandle) -> Result<SchemaOrRef> {
        self.transaction(|synth| synth.synthesize(ty))
    }

    /// Fill the parameters and request body of `operation` from `request`.
    /// Reflected parameters are appended; the request body is replaced.
    pub fn set_request(
        &mut self,
        operation: &mut Operation,
        request: TypeHandle,
        method: HttpMethod,
    ) -> Result<()> {
        let parts = self.transaction(|synth| assembler::request(synth, request, method))?;
        operation.parameters.extend(parts.parameters);
        operation.request_body = parts.request_body;
        Ok(())
    }

    /// Set the response for `status` from `response`. The body uses
    /// `content_type`, or the configured JSON content type when `None`.
    pub fn set_response(
        &mut self,
        operation: &mut Operation,
        response: TypeHandle,
        status: u16,
        content_type: Option<&str>,
    ) -> Result<()> {
        let content_type = content_type
            .unwrap_or(self.config.json_content_type.as_str())
            .to_string();
        let built =
            self.transaction(|synth| assembler::response(synth, response, status, &content_type))?;
        operation.responses.insert(status.to_string(), built);
        Ok(())
    }

    /// Build a complete operation from a request type and
    /// `(status, response type)` pairs.
    pub fn assemble(
        &mut self,
        request: TypeHandle,
        method: HttpMethod,
        responses: &[(u16, TypeHandle)],
    ) -> Result<Operation> {
        let (parts, built) = self.transaction(|synth| {
            let parts = assembler::request(synth, request, method)?;
            let content_type = synth.config().json_content_type.clone();
            let mut built = IndexMap::new();
            for (status, ty) in responses {
                let response = assembler::response(synth, *ty, *status, &content_type)?;
                built.insert(status.to_string(), response);
            }
            Ok((parts, built))
        })?;

        debug!("assembled {method} operation from {request}");
        Ok(Operation {
            parameters: parts.parameters,
            request_body: parts.request_body,
            responses: built,
            ..Operation::default()
        })
    }

    /// Run `f` against the registry, publishing the components it
    /// registered on success and discarding them on failure.
    fn transaction<T>(&mut self, f: impl FnOnce(&mut Synthesizer<'_>) -> Result<T>) -> Result<T> {
        let checkpoint = self.document.registry.checkpoint();
        let outcome = {
            let mut synth = Synthesizer::new(&mut self.document.registry, &self.config);
            f(&mut synth)
        };

        match outcome.and_then(|value| {
            self.document.commit_components(checkpoint)?;
            Ok(value)
        }) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!("reflection failed, rolling back: {err}");
                self.document.registry.rollback(checkpoint);
                Err(err)
            }
        }
    }
}
