pub mod media_type;
pub mod operation;
pub mod parameter;
pub mod request_body;
pub mod response;
pub mod schema;

pub use media_type::MediaType;
pub use operation::{HttpMethod, Operation, PathItem};
pub use parameter::{Parameter, ParameterLocation, ParameterStyle};
pub use request_body::RequestBody;
pub use response::{Header, Response};
pub use schema::{AdditionalProperties, COMPONENT_REF_PREFIX, Schema, SchemaOrRef, SchemaType};

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::error::{ReflectError, Result};
use crate::reflect::registry::{Checkpoint, Registry};

/// Components object holding reusable schema definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Components {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, SchemaOrRef>,
}

/// The document a reflection session writes into.
///
/// Owns the component registry, so every type gets at most one component
/// definition per document. Components and operations are append-only.
#[derive(Debug, Default, Serialize)]
pub struct Document {
    paths: IndexMap<String, PathItem>,

    #[serde(skip_serializing_if = "is_empty_components")]
    components: Components,

    #[serde(skip)]
    pub(crate) registry: Registry,
}

fn is_empty_components(components: &Components) -> bool {
    components.schemas.is_empty()
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> &IndexMap<String, PathItem> {
        &self.paths
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&SchemaOrRef> {
        self.components.schemas.get(name)
    }

    /// Follow a component reference to its definition; inline schemas are
    /// returned as they are.
    pub fn resolve<'a>(&'a self, schema: &'a SchemaOrRef) -> Option<&'a SchemaOrRef> {
        match schema.ref_name() {
            Some(name) => self.component(name),
            None => Some(schema),
        }
    }

    pub fn operation(&self, method: HttpMethod, path: &str) -> Option<&Operation> {
        self.paths.get(path)?.operation(method)
    }

    /// Path item for `path`, created empty when missing.
    pub fn path_item(&mut self, path: &str) -> &mut PathItem {
        self.paths.entry(path.to_string()).or_default()
    }

    /// Attach an operation at `method path`.
    pub fn add_operation(
        &mut self,
        method: HttpMethod,
        path: &str,
        operation: Operation,
    ) -> Result<()> {
        let slot = self.path_item(path).slot_mut(method);
        if slot.is_some() {
            return Err(ReflectError::DuplicateOperation {
                method: method.to_string(),
                path: path.to_string(),
            });
        }
        *slot = Some(operation);
        Ok(())
    }

    /// Insert a finished component. Re-inserting an identical schema is a
    /// no-op; a different schema under a taken name is a collision.
    pub(crate) fn insert_component(&mut self, name: &str, schema: SchemaOrRef) -> Result<()> {
        match self.components.schemas.get(name) {
            Some(existing) if *existing == schema => Ok(()),
            Some(_) => Err(ReflectError::NameCollision(name.to_string())),
            None => {
                self.registry.reserve_name(name);
                self.components.schemas.insert(name.to_string(), schema);
                Ok(())
            }
        }
    }

    /// Publish the components registered since `checkpoint`. Either every
    /// new component is inserted or, on a collision, none is.
    pub(crate) fn commit_components(&mut self, checkpoint: Checkpoint) -> Result<()> {
        let fresh: Vec<(String, SchemaOrRef)> = self
            .registry
            .registered_since(checkpoint)
            .map(|(name, schema)| (name.to_string(), schema.clone()))
            .collect();
        for (name, schema) in &fresh {
            if let Some(existing) = self.components.schemas.get(name)
                && existing != schema
            {
                return Err(ReflectError::NameCollision(name.clone()));
            }
        }
        for (name, schema) in fresh {
            debug!("adding component {name}");
            self.insert_component(&name, schema)?;
        }
        Ok(())
    }

    /// Merge a document assembled independently into this one.
    ///
    /// Components are de-duplicated by name with the first writer winning;
    /// a name bound to a different schema, or an operation defined in both
    /// documents, fails the whole merge before anything is applied.
    pub fn merge(&mut self, other: Document) -> Result<()> {
        for (name, schema) in &other.components.schemas {
            if let Some(existing) = self.components.schemas.get(name)
                && existing != schema
            {
                return Err(ReflectError::NameCollision(name.clone()));
            }
        }
        for (path, item) in &other.paths {
            for (method, _) in item.operations() {
                if self.operation(method, path).is_some() {
                    return Err(ReflectError::DuplicateOperation {
                        method: method.to_string(),
                        path: path.clone(),
                    });
                }
            }
        }

        let Document {
            paths,
            components,
            registry,
        } = other;

        for (name, schema) in components.schemas {
            if !self.components.schemas.contains_key(&name) {
                debug!("merging component {name}");
                self.registry.reserve_name(&name);
                self.components.schemas.insert(name, schema);
            }
        }
        self.registry.absorb(registry, |name, schema| {
            self.components.schemas.get(name) == Some(schema)
        });

        for (path, item) in paths {
            let target = self.path_item(&path);
            if target.summary.is_none() {
                target.summary = item.summary.clone();
            }
            if target.description.is_none() {
                target.description = item.description.clone();
            }
            for (method, op) in item.operations() {
                *target.slot_mut(method) = Some(op.clone());
            }
        }
        Ok(())
    }
}
