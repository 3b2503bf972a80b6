use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix of every component schema reference.
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// A JSON Schema type keyword value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// A reference or inline schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Schema(Box<Schema>),
}

impl SchemaOrRef {
    /// Reference to a named component schema.
    pub fn component(name: &str) -> Self {
        SchemaOrRef::Ref {
            ref_path: format!("{COMPONENT_REF_PREFIX}{name}"),
        }
    }

    /// Name of the referenced component, if this is a component reference.
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            SchemaOrRef::Ref { ref_path } => ref_path.strip_prefix(COMPONENT_REF_PREFIX),
            SchemaOrRef::Schema(_) => None,
        }
    }

    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaOrRef::Schema(schema) => Some(schema),
            SchemaOrRef::Ref { .. } => None,
        }
    }

    /// Turn this node into an inline schema that can carry annotations.
    /// References are wrapped in a single-element `allOf`.
    pub fn into_annotatable(self) -> Schema {
        match self {
            SchemaOrRef::Schema(schema) => *schema,
            reference @ SchemaOrRef::Ref { .. } => Schema {
                all_of: vec![reference],
                ..Schema::default()
            },
        }
    }
}

impl From<Schema> for SchemaOrRef {
    fn from(schema: Schema) -> Self {
        SchemaOrRef::Schema(Box::new(schema))
    }
}

/// A JSON Schema object, restricted to the keywords needed for API description.
/// An empty schema accepts any JSON value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    // Object properties
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaOrRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    // Array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaOrRef>>,

    // Annotated references
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaOrRef>,

    /// Vendor extensions (`x-*` keys).
    #[serde(flatten)]
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl Schema {
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn with_format(schema_type: SchemaType, format: &str) -> Self {
        Self {
            format: Some(format.to_string()),
            ..Self::new(schema_type)
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaType::String)
    }

    /// An open value: no type constraint at all.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn object() -> Self {
        Self::new(SchemaType::Object)
    }

    /// A nullable array of `items`.
    pub fn array(items: SchemaOrRef) -> Self {
        Self {
            items: Some(Box::new(items)),
            nullable: Some(true),
            ..Self::new(SchemaType::Array)
        }
    }

    /// A string-keyed map whose values follow `values`.
    pub fn map(values: SchemaOrRef) -> Self {
        Self {
            additional_properties: Some(AdditionalProperties::Schema(Box::new(values))),
            ..Self::object()
        }
    }

    /// Set a vendor extension. The key is prefixed with `x-` when missing.
    pub fn set_extension(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        let key = if key.starts_with("x-") {
            key.to_string()
        } else {
            format!("x-{key}")
        };
        self.extensions.insert(key, value.into());
    }
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<SchemaOrRef>),
}
