//! Flattening of record types into their effective field list.

use std::collections::HashMap;

use log::trace;

use crate::error::{ReflectError, Result};
use crate::types::{RecordDef, Tags, TypeHandle, TypeKind, UnsupportedShape};

/// One effective field of a walked record.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Declared field name.
    pub name: String,
    /// Field type with one level of optionality removed.
    pub value_type: TypeHandle,
    pub optional: bool,
    pub tags: Tags,
    /// The field is an embedded member that was kept as a single field.
    pub embedded: bool,
    /// Records from the walked type down to the one declaring this field.
    pub embedding_chain: Vec<TypeHandle>,
}

impl FieldDescriptor {
    /// Embedding depth; fields declared directly on the walked type are at 0.
    pub fn depth(&self) -> usize {
        self.embedding_chain.len().saturating_sub(1)
    }

    /// Property name in a JSON body: the `json` tag name, else the field name.
    pub fn property_name(&self) -> &str {
        match self.tags.name("json") {
            Some(name) if !name.is_empty() => name,
            _ => &self.name,
        }
    }
}

pub(crate) fn unsupported(ty: TypeHandle, shape: UnsupportedShape) -> ReflectError {
    ReflectError::UnsupportedKind {
        type_name: ty.type_name().to_string(),
        shape: shape.as_str(),
    }
}

/// Effective fields of `ty`, with embedded records flattened.
///
/// `Option` wrappers around the walked type are looked through. Types
/// that are not records have no fields.
pub fn walk(ty: TypeHandle) -> Result<Vec<FieldDescriptor>> {
    match ty.kind() {
        TypeKind::Record(def) => walk_record(ty, &def),
        TypeKind::Optional(inner) => walk(inner),
        TypeKind::Unsupported(shape) => Err(unsupported(ty, shape)),
        _ => Ok(Vec::new()),
    }
}

/// Like [`walk`], for an already described record.
pub fn walk_record(ty: TypeHandle, def: &RecordDef) -> Result<Vec<FieldDescriptor>> {
    let mut fields = Vec::new();
    expand(def, vec![ty], false, &mut fields)?;
    Ok(resolve_shadowing(fields))
}

fn expand(
    def: &RecordDef,
    chain: Vec<TypeHandle>,
    inherited_optional: bool,
    out: &mut Vec<FieldDescriptor>,
) -> Result<()> {
    for field in &def.fields {
        let tags = Tags::parse(&format!("{}.{}", def.name, field.name), &field.tag)?;

        let (value_type, optional) = match field.ty.kind() {
            TypeKind::Optional(inner) => (inner, true),
            _ => (field.ty, false),
        };
        let optional = optional || inherited_optional;

        let kind = value_type.kind();
        if let TypeKind::Unsupported(shape) = kind {
            return Err(unsupported(value_type, shape));
        }

        let renamed = matches!(tags.name("json"), Some(name) if !name.is_empty());
        if field.embedded
            && !renamed
            && let TypeKind::Record(inner) = &kind
            && !chain.contains(&value_type)
        {
            trace!("promoting fields of {} into {}", inner.name, def.name);
            let mut nested = chain.clone();
            nested.push(value_type);
            expand(inner, nested, optional, out)?;
            continue;
        }

        out.push(FieldDescriptor {
            name: field.name.clone(),
            value_type,
            optional,
            tags,
            embedded: field.embedded,
            embedding_chain: chain.clone(),
        });
    }
    Ok(())
}

/// Keep one field per name: the shallowest, and among equally deep ones
/// the first declared.
fn resolve_shadowing(fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    let mut winners: Vec<usize> = {
        let mut shallowest: HashMap<&str, (usize, usize)> = HashMap::new();
        for (index, field) in fields.iter().enumerate() {
            let depth = field.depth();
            shallowest
                .entry(field.name.as_str())
                .and_modify(|best| {
                    if depth < best.0 {
                        *best = (depth, index);
                    }
                })
                .or_insert((depth, index));
        }
        shallowest.into_values().map(|(_, index)| index).collect()
    };
    winners.sort_unstable();

    let mut slots: Vec<Option<FieldDescriptor>> = fields.into_iter().map(Some).collect();
    winners
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}
