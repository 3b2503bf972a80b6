pub mod config;
pub mod document;
pub mod error;
pub mod reflect;
pub mod types;

pub use config::ReflectorConfig;
pub use document::Document;
pub use error::{ReflectError, Result};
pub use reflect::{Reflector, TypeMapping};
pub use types::{Reflect, TypeHandle, TypeKind};
