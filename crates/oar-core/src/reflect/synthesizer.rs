//! Schema synthesis from type descriptors.

use std::num::ParseIntError;

use serde_json::{Number, Value};

use crate::config::ReflectorConfig;
use crate::document::{Schema, SchemaOrRef, SchemaType};
use crate::error::{ReflectError, Result};
use crate::types::{Primitive, RecordDef, TypeHandle, TypeKind, TypeName};

use super::classifier::{Location, classify, is_required};
use super::registry::{Registry, TypeMapping};
use super::walker::{FieldDescriptor, unsupported, walk_record};

/// Upper bound on `Named`/`Optional` hops when looking for a scalar type.
pub(crate) const MAX_ALIAS_DEPTH: usize = 16;

/// Turns type handles into schema nodes, registering components as it goes.
pub struct Synthesizer<'a> {
    registry: &'a mut Registry,
    config: &'a ReflectorConfig,
    /// Types currently replaced by a mapping, to detect mapping loops.
    substitutions: Vec<TypeHandle>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(registry: &'a mut Registry, config: &'a ReflectorConfig) -> Self {
        Self {
            registry,
            config,
            substitutions: Vec::new(),
        }
    }

    pub fn config(&self) -> &ReflectorConfig {
        self.config
    }

    /// Whether a caller mapping replaces `ty`.
    pub fn is_mapped(&self, ty: TypeHandle) -> bool {
        self.registry.type_mapping(ty).is_some()
    }

    /// Schema node for `ty`. Records and named types become components and
    /// are returned as references; everything else is inlined.
    pub fn synthesize(&mut self, ty: TypeHandle) -> Result<SchemaOrRef> {
        if let Some(mapping) = self.registry.type_mapping(ty).cloned() {
            return match mapping {
                TypeMapping::Schema(schema) => Ok(schema.into()),
                TypeMapping::Type(target) => self.substitute(ty, target),
            };
        }

        let kind = ty.kind();
        match &kind {
            TypeKind::Record(def) => self.component(ty, &def.name, &kind),
            TypeKind::Named { name, .. } => self.component(ty, name, &kind),
            TypeKind::Optional(inner) => self.synthesize(*inner),
            TypeKind::Interface(name) => match self.registry.interface_mapping(ty) {
                Some(concrete) => self.substitute(ty, concrete),
                None => Err(ReflectError::UnmappedInterface(name.to_string())),
            },
            TypeKind::Unsupported(shape) => Err(unsupported(ty, *shape)),
            _ => self.definition(ty, &kind),
        }
    }

    /// Schema of a field: the value type's schema plus the field's
    /// annotation tags. `deprecated` is left to the caller when
    /// `with_deprecated` is false.
    pub fn field_schema(
        &mut self,
        field: &FieldDescriptor,
        with_deprecated: bool,
    ) -> Result<SchemaOrRef> {
        let schema = self.synthesize(field.value_type)?;
        annotate_field(schema, field, with_deprecated)
    }

    fn substitute(&mut self, from: TypeHandle, to: TypeHandle) -> Result<SchemaOrRef> {
        if self.substitutions.contains(&from) {
            return Err(ReflectError::SelfReference(from.to_string()));
        }
        self.substitutions.push(from);
        let result = self.synthesize(to);
        self.substitutions.pop();
        result
    }

    fn component(
        &mut self,
        ty: TypeHandle,
        name: &TypeName,
        kind: &TypeKind,
    ) -> Result<SchemaOrRef> {
        // Pending entries are returned as references too, which is what
        // stops recursive types.
        if let Some(entry) = self.registry.resolve(ty) {
            return Ok(SchemaOrRef::component(&entry.canonical_name));
        }
        let canonical = self.registry.begin(ty, name, self.config.strip_namespace);

        // A pending component already terminates any cycle through it, so
        // substitutions made outside it cannot loop back from inside.
        let outer = std::mem::take(&mut self.substitutions);
        let schema = self.definition(ty, kind);
        self.substitutions = outer;

        self.registry.complete(ty, schema?)?;
        Ok(SchemaOrRef::component(&canonical))
    }

    /// Full definition of `ty`: custom or default schema, then the type's
    /// amendment hook, then its title and description.
    fn definition(&mut self, ty: TypeHandle, kind: &TypeKind) -> Result<SchemaOrRef> {
        let base = match ty.custom_schema() {
            Some(schema) => schema.into(),
            None => self.default_definition(ty, kind)?,
        };
        decorate(ty, base)
    }

    fn default_definition(&mut self, ty: TypeHandle, kind: &TypeKind) -> Result<SchemaOrRef> {
        let schema = match kind {
            TypeKind::Primitive(primitive) => primitive_schema(*primitive),
            TypeKind::Array(item) => Schema::array(self.synthesize(*item)?),
            TypeKind::FixedArray { item, .. } => Schema {
                items: Some(Box::new(self.synthesize(*item)?)),
                ..Schema::new(SchemaType::Array)
            },
            TypeKind::Map { value, .. } => Schema::map(self.synthesize(*value)?),
            TypeKind::Any => Schema::any(),
            TypeKind::Record(def) => return self.record_schema(ty, def),
            TypeKind::Named { target, .. } => return self.synthesize(*target),
            TypeKind::Optional(_) | TypeKind::Interface(_) | TypeKind::Unsupported(_) => {
                return self.synthesize(ty);
            }
        };
        Ok(schema.into())
    }

    fn record_schema(&mut self, ty: TypeHandle, def: &RecordDef) -> Result<SchemaOrRef> {
        let mut body = Vec::new();
        for field in walk_record(ty, def)? {
            if classify(&field)? == Location::Body {
                body.push(field);
            }
        }

        if let [only] = body.as_slice()
            && only.embedded
            && !matches!(only.value_type.kind(), TypeKind::Record(_))
        {
            return self.inline_definition(only.value_type);
        }

        let mut schema = Schema::object();
        for field in &body {
            let property = self.field_schema(field, true)?;
            let name = field.property_name().to_string();
            if is_required(field, Location::Body)? {
                schema.required.push(name.clone());
            }
            schema.properties.insert(name, property);
        }
        Ok(schema.into())
    }

    /// Definition of `ty` without registering it as a component.
    fn inline_definition(&mut self, ty: TypeHandle) -> Result<SchemaOrRef> {
        if self.is_mapped(ty) {
            return self.synthesize(ty);
        }
        match ty.kind() {
            kind @ TypeKind::Named { .. } => self.definition(ty, &kind),
            _ => self.synthesize(ty),
        }
    }
}

fn primitive_schema(primitive: Primitive) -> Schema {
    match primitive {
        Primitive::Bool => Schema::new(SchemaType::Boolean),
        Primitive::Int8
        | Primitive::Int16
        | Primitive::Int32
        | Primitive::Uint8
        | Primitive::Uint16
        | Primitive::Uint32 => Schema::with_format(SchemaType::Integer, "int32"),
        Primitive::Int64 | Primitive::Uint64 => Schema::with_format(SchemaType::Integer, "int64"),
        Primitive::Float32 => Schema::with_format(SchemaType::Number, "float"),
        Primitive::Float64 => Schema::with_format(SchemaType::Number, "double"),
        Primitive::String => Schema::string(),
        Primitive::Bytes => Schema::with_format(SchemaType::String, "byte"),
        Primitive::File => Schema::with_format(SchemaType::String, "binary"),
    }
}

/// Apply the type-level hooks. A reference is only wrapped when a hook
/// actually changed something.
fn decorate(ty: TypeHandle, base: SchemaOrRef) -> Result<SchemaOrRef> {
    let is_ref = matches!(base, SchemaOrRef::Ref { .. });
    let mut schema = base.clone().into_annotatable();
    let untouched = is_ref.then(|| schema.clone());

    ty.prepare_schema(&mut schema)?;
    if let Some(title) = ty.title() {
        schema.title = Some(title);
    }
    if let Some(description) = ty.description() {
        schema.description = Some(description);
    }

    match untouched {
        Some(untouched) if untouched == schema => Ok(base),
        _ => Ok(schema.into()),
    }
}

fn annotate_field(
    schema: SchemaOrRef,
    field: &FieldDescriptor,
    with_deprecated: bool,
) -> Result<SchemaOrRef> {
    let tags = &field.tags;
    let description = tags.get("description");
    let pattern = tags.get("pattern");
    let default_value = tags
        .get("default")
        .map(|raw| parse_tag_value(field, "default", raw))
        .transpose()?;
    let example = tags
        .get("example")
        .map(|raw| parse_tag_value(field, "example", raw))
        .transpose()?;
    let deprecated = if with_deprecated {
        tags.flag("deprecated", &field.name)?.filter(|d| *d)
    } else {
        None
    };

    if description.is_none()
        && pattern.is_none()
        && default_value.is_none()
        && example.is_none()
        && deprecated.is_none()
    {
        return Ok(schema);
    }

    let mut schema = schema.into_annotatable();
    if let Some(description) = description {
        schema.description = Some(description.to_string());
    }
    if let Some(pattern) = pattern {
        schema.pattern = Some(pattern.to_string());
    }
    if default_value.is_some() {
        schema.default_value = default_value;
    }
    if example.is_some() {
        schema.example = example;
    }
    if deprecated.is_some() {
        schema.deprecated = deprecated;
    }
    Ok(schema.into())
}

/// Scalar type behind named wrappers and optionality, if any.
pub(crate) fn scalar_of(ty: TypeHandle) -> Option<Primitive> {
    let mut current = ty;
    for _ in 0..MAX_ALIAS_DEPTH {
        match current.kind() {
            TypeKind::Primitive(primitive) => return Some(primitive),
            TypeKind::Named { target, .. } | TypeKind::Optional(target) => current = target,
            _ => return None,
        }
    }
    None
}

/// Parse a `default`/`example` tag value according to the field's type.
fn parse_tag_value(field: &FieldDescriptor, tag: &str, raw: &str) -> Result<Value> {
    let invalid = |reason: String| ReflectError::invalid_tag(&field.name, tag, reason);

    match scalar_of(field.value_type) {
        Some(Primitive::Bool) => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid(format!("`{raw}` is not a boolean"))),
        },
        Some(p) if p.is_integer() => parse_integer(p, raw)
            .map_err(|e| invalid(format!("`{raw}` is not a valid {p:?} value: {e}"))),
        Some(p) if p.is_float() => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid(format!("`{raw}` is not a finite number"))),
        Some(_) => Ok(Value::String(raw.to_string())),
        None => match field.value_type.kind() {
            // Open values accept JSON and fall back to the raw text.
            TypeKind::Any => {
                Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
            }
            _ => serde_json::from_str(raw)
                .map_err(|e| invalid(format!("`{raw}` is not valid JSON: {e}"))),
        },
    }
}

/// Parse an integer tag value within the range of `primitive`.
fn parse_integer(primitive: Primitive, raw: &str) -> std::result::Result<Value, ParseIntError> {
    Ok(match primitive {
        Primitive::Int8 => raw.parse::<i8>()?.into(),
        Primitive::Int16 => raw.parse::<i16>()?.into(),
        Primitive::Int32 => raw.parse::<i32>()?.into(),
        Primitive::Uint8 => raw.parse::<u8>()?.into(),
        Primitive::Uint16 => raw.parse::<u16>()?.into(),
        Primitive::Uint32 => raw.parse::<u32>()?.into(),
        Primitive::Uint64 => raw.parse::<u64>()?.into(),
        _ => raw.parse::<i64>()?.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Reflect, Tags};
    use serde_json::json;

    struct Week;
    struct Tree;

    impl Reflect for Week {
        fn describe() -> TypeKind {
            TypeKind::Named {
                name: TypeName::new("cal", "Week"),
                target: TypeHandle::of::<String>(),
            }
        }

        fn prepare_schema(schema: &mut Schema) -> Result<()> {
            schema.pattern = Some(r"^\d{4}-W\d{2}$".to_string());
            Ok(())
        }
    }

    impl Reflect for Tree {
        fn describe() -> TypeKind {
            TypeKind::Record(
                RecordDef::new(TypeName::new("cal", "Tree"))
                    .field::<Vec<Tree>>("Children", r#"json:"children""#)
                    .field::<Option<Box<Tree>>>("Parent", r#"json:"parent""#),
            )
        }
    }

    fn synthesize(registry: &mut Registry, ty: TypeHandle) -> SchemaOrRef {
        let config = ReflectorConfig::default();
        Synthesizer::new(registry, &config).synthesize(ty).unwrap()
    }

    fn to_json(schema: &SchemaOrRef) -> Value {
        serde_json::to_value(schema).unwrap()
    }

    #[test]
    fn test_primitives() {
        let mut registry = Registry::default();
        let cases = [
            (TypeHandle::of::<bool>(), json!({"type": "boolean"})),
            (TypeHandle::of::<u16>(), json!({"type": "integer", "format": "int32"})),
            (TypeHandle::of::<i64>(), json!({"type": "integer", "format": "int64"})),
            (TypeHandle::of::<f32>(), json!({"type": "number", "format": "float"})),
            (TypeHandle::of::<String>(), json!({"type": "string"})),
            (TypeHandle::of::<Vec<u8>>(), json!({"type": "string", "format": "byte"})),
            (
                TypeHandle::of::<[u8; 4]>(),
                json!({"type": "array", "items": {"type": "integer", "format": "int32"}}),
            ),
            (TypeHandle::of::<Value>(), json!({})),
        ];
        for (ty, expected) in cases {
            assert_eq!(to_json(&synthesize(&mut registry, ty)), expected, "{ty}");
        }
    }

    #[test]
    fn test_named_type_hooks() {
        let mut registry = Registry::default();
        let week = synthesize(&mut registry, TypeHandle::of::<Week>());
        assert_eq!(week, SchemaOrRef::component("CalWeek"));
        let entry = registry.resolve(TypeHandle::of::<Week>()).unwrap();
        assert_eq!(
            to_json(entry.schema.as_ref().unwrap()),
            json!({"type": "string", "pattern": r"^\d{4}-W\d{2}$"})
        );
    }

    #[test]
    fn test_recursive_record() {
        let mut registry = Registry::default();
        let tree = synthesize(&mut registry, TypeHandle::of::<Tree>());
        assert_eq!(tree, SchemaOrRef::component("CalTree"));
        let entry = registry.resolve(TypeHandle::of::<Tree>()).unwrap();
        assert_eq!(
            to_json(entry.schema.as_ref().unwrap()),
            json!({
                "type": "object",
                "properties": {
                    "children": {
                        "type": "array",
                        "items": {"$ref": "#/components/schemas/CalTree"},
                        "nullable": true
                    },
                    "parent": {"$ref": "#/components/schemas/CalTree"}
                },
                "required": ["children"]
            })
        );
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let mut registry = Registry::default();
        let first = synthesize(&mut registry, TypeHandle::of::<Tree>());
        let checkpoint = registry.checkpoint();
        let second = synthesize(&mut registry, TypeHandle::of::<Tree>());
        assert_eq!(first, second);
        assert_eq!(registry.registered_since(checkpoint).count(), 0);
    }

    #[test]
    fn test_schema_mapping_is_inlined() {
        let mut registry = Registry::default();
        registry.add_type_mapping(
            TypeHandle::of::<Week>(),
            Schema::with_format(SchemaType::String, "iso-week").into(),
        );
        let schema = synthesize(&mut registry, TypeHandle::of::<Week>());
        assert_eq!(to_json(&schema), json!({"type": "string", "format": "iso-week"}));
        assert!(registry.resolve(TypeHandle::of::<Week>()).is_none());
    }

    #[test]
    fn test_mapping_loop_is_reported() {
        let mut registry = Registry::default();
        registry.add_type_mapping(TypeHandle::of::<Week>(), TypeMapping::to::<Tree>());
        registry.add_type_mapping(TypeHandle::of::<Tree>(), TypeMapping::to::<Week>());
        let config = ReflectorConfig::default();
        let err = Synthesizer::new(&mut registry, &config)
            .synthesize(TypeHandle::of::<Week>())
            .unwrap_err();
        assert!(matches!(err, ReflectError::SelfReference(_)));
    }

    trait Shape {}

    struct Group;

    impl Reflect for dyn Shape {
        fn describe() -> TypeKind {
            TypeKind::Interface(TypeName::new("draw", "Shape"))
        }
    }

    impl Reflect for Group {
        fn describe() -> TypeKind {
            TypeKind::Record(
                RecordDef::new(TypeName::new("draw", "Group"))
                    .field::<Vec<Box<dyn Shape>>>("Children", r#"json:"children""#),
            )
        }
    }

    #[test]
    fn test_interface_mapped_to_record_containing_it() {
        let mut registry = Registry::default();
        registry.add_type_mapping(TypeHandle::of::<dyn Shape>(), TypeMapping::to::<Group>());
        let shape = synthesize(&mut registry, TypeHandle::of::<dyn Shape>());
        assert_eq!(shape, SchemaOrRef::component("DrawGroup"));

        let entry = registry.resolve(TypeHandle::of::<Group>()).unwrap();
        assert_eq!(
            to_json(entry.schema.as_ref().unwrap()),
            json!({
                "type": "object",
                "properties": {
                    "children": {
                        "type": "array",
                        "items": {"$ref": "#/components/schemas/DrawGroup"},
                        "nullable": true
                    }
                },
                "required": ["children"]
            })
        );
    }

    fn field<T: Reflect>(tag: &str) -> FieldDescriptor {
        FieldDescriptor {
            name: "F".to_string(),
            value_type: TypeHandle::of::<T>(),
            optional: false,
            tags: Tags::parse("F", tag).unwrap(),
            embedded: false,
            embedding_chain: Vec::new(),
        }
    }

    #[test]
    fn test_tag_values_are_typed() {
        let value = |f: FieldDescriptor, raw: &str| parse_tag_value(&f, "default", raw).unwrap();
        assert_eq!(value(field::<i32>(""), "-4"), json!(-4));
        assert_eq!(value(field::<f64>(""), "1.5"), json!(1.5));
        assert_eq!(value(field::<bool>(""), "true"), json!(true));
        assert_eq!(value(field::<Week>(""), "2006-W01"), json!("2006-W01"));
        assert_eq!(value(field::<Vec<i32>>(""), "[1,2]"), json!([1, 2]));
        assert_eq!(value(field::<Value>(""), "abc"), json!("abc"));
        assert_eq!(value(field::<u64>(""), "18446744073709551615"), json!(u64::MAX));
    }

    #[test]
    fn test_integer_tag_values_respect_width() {
        let check = |f: FieldDescriptor, raw: &str| parse_tag_value(&f, "default", raw);
        assert_eq!(check(field::<u8>(""), "255").unwrap(), json!(255));
        assert!(check(field::<u8>(""), "300").is_err());
        assert!(check(field::<u8>(""), "-1").is_err());
        assert_eq!(check(field::<i8>(""), "-128").unwrap(), json!(-128));
        assert!(check(field::<i8>(""), "-129").is_err());
        assert!(check(field::<u16>(""), "65536").is_err());
        assert!(check(field::<i32>(""), "2147483648").is_err());
        assert!(check(field::<u32>(""), "4294967295").is_ok());

        let err = check(field::<Option<u8>>(""), "300").unwrap_err();
        assert!(matches!(err, ReflectError::InvalidTagValue { tag, .. } if tag == "default"));
    }

    #[test]
    fn test_bad_tag_values() {
        let err = parse_tag_value(&field::<u32>(""), "default", "ten").unwrap_err();
        assert!(matches!(err, ReflectError::InvalidTagValue { tag, .. } if tag == "default"));
        assert!(parse_tag_value(&field::<bool>(""), "example", "yes").is_err());
        assert!(parse_tag_value(&field::<Vec<i32>>(""), "example", "1,2").is_err());
    }

    #[test]
    fn test_field_annotations_wrap_refs() {
        let mut registry = Registry::default();
        let config = ReflectorConfig::default();
        let mut synth = Synthesizer::new(&mut registry, &config);
        let schema = synth
            .field_schema(&field::<Week>(r#"description:"ISO week." deprecated:"true""#), true)
            .unwrap();
        assert_eq!(
            to_json(&schema),
            json!({
                "description": "ISO week.",
                "deprecated": true,
                "allOf": [{"$ref": "#/components/schemas/CalWeek"}]
            })
        );

        let plain = synth
            .field_schema(&field::<Week>(r#"deprecated:"true""#), false)
            .unwrap();
        assert_eq!(plain, SchemaOrRef::component("CalWeek"));
    }
}
