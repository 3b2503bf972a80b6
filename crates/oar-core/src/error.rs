use thiserror::Error;

/// Errors raised while reflecting types into an OpenAPI document.
///
/// Reflection over a fixed type graph is deterministic, so none of these are
/// transient: each one points at a type definition or tag that needs fixing.
#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("type {type_name} has no schema representation ({shape})")]
    UnsupportedKind {
        type_name: String,
        shape: &'static str,
    },

    #[error("field {field} carries conflicting location tags: {tags}")]
    AmbiguousLocation { field: String, tags: String },

    #[error("interface {0} has no registered concrete mapping")]
    UnmappedInterface(String),

    #[error("component name {0} is already bound to a different schema")]
    NameCollision(String),

    #[error("invalid value for tag `{tag}` on {field}: {reason}")]
    InvalidTagValue {
        field: String,
        tag: String,
        reason: String,
    },

    #[error("component {0} resolves to a reference to itself")]
    SelfReference(String),

    #[error("operation {method} {path} is already defined")]
    DuplicateOperation { method: String, path: String },

    #[error("failed to parse reflector config: {0}")]
    Config(#[from] serde_yaml_ng::Error),
}

impl ReflectError {
    pub(crate) fn invalid_tag(
        field: impl Into<String>,
        tag: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ReflectError::InvalidTagValue {
            field: field.into(),
            tag: tag.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = ReflectError> = std::result::Result<T, E>;
