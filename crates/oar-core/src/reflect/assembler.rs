//! Building operation parts from request and response types.

use indexmap::IndexMap;
use log::debug;

use crate::document::{
    Header, HttpMethod, MediaType, Parameter, ParameterLocation, ParameterStyle, RequestBody,
    Response, SchemaOrRef,
};
use crate::error::{ReflectError, Result};
use crate::types::{RecordDef, TypeHandle, TypeKind};

use super::classifier::{Location, classify, is_required, parameter_name};
use super::naming::status_text;
use super::synthesizer::{MAX_ALIAS_DEPTH, Synthesizer, scalar_of};
use super::walker::{FieldDescriptor, walk};

/// The request half of an operation.
#[derive(Debug, Default)]
pub struct RequestParts {
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
}

/// Record definition behind `ty`, looking through `Option`.
fn record_of(ty: TypeHandle) -> Option<RecordDef> {
    match ty.kind() {
        TypeKind::Record(def) => Some(def),
        TypeKind::Optional(inner) => record_of(inner),
        _ => None,
    }
}

/// Derive parameters and request body from a request type.
pub fn request(
    synth: &mut Synthesizer<'_>,
    ty: TypeHandle,
    method: HttpMethod,
) -> Result<RequestParts> {
    let mut located = Vec::new();
    for field in walk(ty)? {
        let location = classify(&field)?;
        located.push((location, field));
    }

    let mut ranked = Vec::new();
    for (location, field) in &located {
        if let (Some(rank), Some(in_)) = (location.parameter_rank(), location.parameter_location())
        {
            ranked.push((rank, parameter(synth, *location, in_, field)?));
        }
    }
    // Stable: declaration order is kept within a location group.
    ranked.sort_by_key(|(rank, _)| *rank);
    let parameters: Vec<Parameter> = ranked.into_iter().map(|(_, p)| p).collect();

    let record = record_of(ty);
    let forced = record.as_ref().is_some_and(|def| def.force_request_body);
    let wants_body = match &record {
        Some(_) => forced || located.iter().any(|(l, _)| *l == Location::Body),
        None => scalar_of(ty).is_none(),
    };

    let request_body = if wants_body && (forced || !synth.config().is_bodyless(method)) {
        let schema = synth.synthesize(ty)?;
        Some(json_body(synth, schema))
    } else {
        None
    };

    debug!(
        "request {ty} for {method}: {} parameters, body: {}",
        parameters.len(),
        request_body.is_some()
    );
    Ok(RequestParts {
        parameters,
        request_body,
    })
}

fn json_body(synth: &Synthesizer<'_>, schema: SchemaOrRef) -> RequestBody {
    let mut content = IndexMap::new();
    content.insert(
        synth.config().json_content_type.clone(),
        MediaType::with_schema(schema),
    );
    RequestBody {
        description: None,
        content,
        required: false,
    }
}

fn parameter(
    synth: &mut Synthesizer<'_>,
    location: Location,
    in_: ParameterLocation,
    field: &FieldDescriptor,
) -> Result<Parameter> {
    let (style, explode) = if synth.is_mapped(field.value_type) {
        (None, None)
    } else {
        encoding_hints(location, field)?
    };
    Ok(Parameter {
        name: parameter_name(field, location).to_string(),
        location: in_,
        description: field.tags.get("description").map(str::to_string),
        required: is_required(field, location)?,
        deprecated: field.tags.flag("deprecated", &field.name)?.filter(|d| *d),
        schema: synth.field_schema(field, false)?,
        style,
        explode,
    })
}

fn is_array_like(ty: TypeHandle) -> bool {
    let mut current = ty;
    for _ in 0..MAX_ALIAS_DEPTH {
        match current.kind() {
            TypeKind::Array(_) | TypeKind::FixedArray { .. } => return true,
            TypeKind::Named { target, .. } | TypeKind::Optional(target) => current = target,
            _ => return false,
        }
    }
    false
}

/// Style and explode for array-valued query and header parameters.
///
/// Arrays are comma-joined unless `collectionFormat` asks otherwise; an
/// explicit `explode` tag overrides the format's choice.
fn encoding_hints(
    location: Location,
    field: &FieldDescriptor,
) -> Result<(Option<ParameterStyle>, Option<bool>)> {
    if !matches!(location, Location::Query | Location::Header) || !is_array_like(field.value_type)
    {
        return Ok((None, None));
    }

    let format = field.tags.get("collectionFormat");
    let (style, explode) = match (location, format) {
        (Location::Query, None | Some("csv")) => (ParameterStyle::Form, false),
        (Location::Query, Some("ssv")) => (ParameterStyle::SpaceDelimited, false),
        (Location::Query, Some("pipes")) => (ParameterStyle::PipeDelimited, false),
        (Location::Query, Some("multi")) => (ParameterStyle::Form, true),
        (Location::Header, None | Some("csv")) => (ParameterStyle::Simple, false),
        (_, Some(other)) => {
            return Err(ReflectError::invalid_tag(
                &field.name,
                "collectionFormat",
                format!("`{other}` is not supported for {location} parameters"),
            ));
        }
        _ => return Ok((None, None)),
    };

    let explode = field.tags.flag("explode", &field.name)?.unwrap_or(explode);
    Ok((Some(style), Some(explode)))
}

/// Derive a response from a response type.
pub fn response(
    synth: &mut Synthesizer<'_>,
    ty: TypeHandle,
    status: u16,
    content_type: &str,
) -> Result<Response> {
    let mut headers = IndexMap::new();
    let mut has_body = false;
    for field in walk(ty)? {
        match classify(&field)? {
            Location::Header => {
                let header = Header {
                    description: field.tags.get("description").map(str::to_string),
                    required: is_required(&field, Location::Header)?,
                    deprecated: field.tags.flag("deprecated", &field.name)?.filter(|d| *d),
                    schema: synth.field_schema(&field, false)?,
                };
                headers.insert(parameter_name(&field, Location::Header).to_string(), header);
            }
            Location::Body => has_body = true,
            _ => {}
        }
    }

    let mut content = IndexMap::new();
    if has_body || record_of(ty).is_none() {
        let schema = synth.synthesize(ty)?;
        content.insert(content_type.to_string(), MediaType::with_schema(schema));
    }

    debug!(
        "response {status} from {ty}: {} headers, body: {}",
        headers.len(),
        !content.is_empty()
    );
    Ok(Response {
        description: status_text(status),
        headers,
        content,
    })
}
