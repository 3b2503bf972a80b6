//! Type metadata consumed by the reflection engine.
//!
//! Rust has no runtime field reflection, so every reflectable type describes
//! itself through [`Reflect`]. The engine only ever sees [`TypeHandle`]s and
//! the [`TypeKind`] they report; it never inspects values.

pub mod std_impls;
pub mod tags;

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::document::Schema;
use crate::error::Result;

pub use std_impls::FileUpload;
pub use tags::Tags;

/// A type that can be reflected into a schema.
///
/// Only [`describe`](Reflect::describe) is required. The remaining methods
/// are per-type hooks consulted by the schema registry.
pub trait Reflect: 'static {
    /// Shape of this type.
    fn describe() -> TypeKind;

    /// Identity used for this type. Transparent wrappers such as `Box<T>`
    /// return the handle of the wrapped type.
    fn handle() -> TypeHandle {
        TypeHandle::new::<Self>()
    }

    /// A complete schema replacing the default synthesis for this type.
    fn custom_schema() -> Option<Schema> {
        None
    }

    /// Amend the synthesized schema (applied after default synthesis or
    /// [`custom_schema`](Reflect::custom_schema)).
    fn prepare_schema(_schema: &mut Schema) -> Result<()> {
        Ok(())
    }

    fn title() -> Option<String> {
        None
    }

    fn description() -> Option<String> {
        None
    }
}

/// Opaque identity of a declared type.
///
/// Two handles are equal iff they denote the same Rust type; structurally
/// identical types stay distinct. The descriptor is produced lazily so that
/// recursive type graphs can be described.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    id: TypeId,
    type_name: &'static str,
    describe: fn() -> TypeKind,
    custom_schema: fn() -> Option<Schema>,
    prepare_schema: fn(&mut Schema) -> Result<()>,
    title: fn() -> Option<String>,
    description: fn() -> Option<String>,
}

impl TypeHandle {
    /// Handle for `T`, honouring transparent wrappers.
    pub fn of<T: Reflect + ?Sized>() -> Self {
        T::handle()
    }

    /// Handle for exactly `T`, bypassing [`Reflect::handle`].
    pub fn new<T: Reflect + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            describe: T::describe,
            custom_schema: T::custom_schema,
            prepare_schema: T::prepare_schema,
            title: T::title,
            description: T::description,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> TypeKind {
        (self.describe)()
    }

    pub(crate) fn custom_schema(&self) -> Option<Schema> {
        (self.custom_schema)()
    }

    pub(crate) fn prepare_schema(&self, schema: &mut Schema) -> Result<()> {
        (self.prepare_schema)(schema)
    }

    pub(crate) fn title(&self) -> Option<String> {
        (self.title)()
    }

    pub(crate) fn description(&self) -> Option<String> {
        (self.description)()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.type_name)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Declared name of a type: an optional namespace qualifier plus the type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub namespace: Option<String>,
    pub name: String,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// A name without namespace qualifier.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Scalar value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    /// Byte sequence, transported as base64.
    Bytes,
    /// Uploaded file content.
    File,
}

impl Primitive {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Primitive::Int8
                | Primitive::Int16
                | Primitive::Int32
                | Primitive::Int64
                | Primitive::Uint8
                | Primitive::Uint16
                | Primitive::Uint32
                | Primitive::Uint64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Primitive::Float32 | Primitive::Float64)
    }
}

/// Shapes that have no schema representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedShape {
    Function,
    Channel,
    RawPointer,
}

impl UnsupportedShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnsupportedShape::Function => "function",
            UnsupportedShape::Channel => "channel",
            UnsupportedShape::RawPointer => "raw pointer",
        }
    }
}

/// A declared field of a record.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeHandle,
    /// Raw struct tag, see [`tags`].
    pub tag: String,
    /// Embedded (anonymous) field whose members are promoted into the parent.
    pub embedded: bool,
}

/// A record type with named fields.
#[derive(Debug, Clone)]
pub struct RecordDef {
    pub name: TypeName,
    pub fields: Vec<FieldDef>,
    /// Produce a request body even for body-less methods or empty bodies.
    pub force_request_body: bool,
}

impl RecordDef {
    pub fn new(name: TypeName) -> Self {
        Self {
            name,
            fields: Vec::new(),
            force_request_body: false,
        }
    }

    /// Add a named field of type `T`.
    pub fn field<T: Reflect + ?Sized>(self, name: &str, tag: &str) -> Self {
        self.field_of(name, TypeHandle::of::<T>(), tag)
    }

    pub fn field_of(mut self, name: &str, ty: TypeHandle, tag: &str) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            ty,
            tag: tag.to_string(),
            embedded: false,
        });
        self
    }

    /// Embed `T`: its fields are promoted into this record.
    pub fn embed<T: Reflect + ?Sized>(self) -> Self {
        self.embed_tagged::<T>("")
    }

    /// Embed `T` with a tag. The field is named after the Rust type, without
    /// describing it, so a record may embed itself.
    pub fn embed_tagged<T: Reflect + ?Sized>(mut self, tag: &str) -> Self {
        let ty = TypeHandle::of::<T>();
        self.fields.push(FieldDef {
            name: short_type_name(ty.type_name()).to_string(),
            ty,
            tag: tag.to_string(),
            embedded: true,
        });
        self
    }

    pub fn force_request_body(mut self) -> Self {
        self.force_request_body = true;
        self
    }
}

/// Last path segment of a Rust type name, generics stripped.
fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Shape of a type as seen by the engine.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(Primitive),
    /// A value that may be absent (`Option<T>`).
    Optional(TypeHandle),
    /// A variable-length sequence.
    Array(TypeHandle),
    FixedArray { item: TypeHandle, len: usize },
    /// A map; keys are assumed to serialize as strings.
    Map { key: TypeHandle, value: TypeHandle },
    /// Arbitrary JSON.
    Any,
    Record(RecordDef),
    /// A named wrapper around another type, e.g. `struct Week(String)`.
    Named { name: TypeName, target: TypeHandle },
    /// An open capability set; needs an interface mapping to a concrete type.
    Interface(TypeName),
    Unsupported(UnsupportedShape),
}

impl TypeKind {
    /// Declared name of named kinds.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            TypeKind::Record(def) => Some(&def.name),
            TypeKind::Named { name, .. } | TypeKind::Interface(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, TypeKind::Primitive(Primitive::File))
    }
}
