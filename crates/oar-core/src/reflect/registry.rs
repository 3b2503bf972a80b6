use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::debug;

use crate::document::{Schema, SchemaOrRef};
use crate::error::{ReflectError, Result};
use crate::types::{Reflect, TypeHandle, TypeKind, TypeName};

use super::naming::{component_name, unique_name};

/// Synthesis state of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// The type is being synthesized; references to it must not recurse.
    Pending,
    Complete,
}

/// A named component owned by the registry.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub canonical_name: String,
    /// `None` while pending.
    pub schema: Option<SchemaOrRef>,
    pub state: EntryState,
}

/// A caller-supplied override for one type.
#[derive(Debug, Clone)]
pub enum TypeMapping {
    /// Use this schema verbatim wherever the type appears.
    Schema(Schema),
    /// Synthesize this type instead. For interfaces this is the concrete
    /// implementation to describe.
    Type(TypeHandle),
}

impl TypeMapping {
    pub fn to<T: Reflect + ?Sized>() -> Self {
        TypeMapping::Type(TypeHandle::of::<T>())
    }
}

impl From<Schema> for TypeMapping {
    fn from(schema: Schema) -> Self {
        TypeMapping::Schema(schema)
    }
}

impl From<TypeHandle> for TypeMapping {
    fn from(handle: TypeHandle) -> Self {
        TypeMapping::Type(handle)
    }
}

/// Registry state at a point in time, used to undo a failed reflection call.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    entries: usize,
    allocated: usize,
}

/// Maps type identity to component names and memoized schemas.
///
/// Entries are never evicted within a session: resolving a type twice
/// yields the same entry, so each type is defined once per document.
#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<TypeHandle, RegistryEntry>,
    used_names: HashSet<String>,
    /// Names allocated by `begin`, in order, so a rollback can release them.
    allocated: Vec<String>,
    type_mappings: HashMap<TypeHandle, TypeMapping>,
    interface_mappings: HashMap<TypeHandle, TypeHandle>,
}

impl Registry {
    /// Register an override. A type mapping on an interface becomes its
    /// interface → concrete substitution.
    pub fn add_type_mapping(&mut self, source: TypeHandle, mapping: TypeMapping) {
        match (mapping, source.kind()) {
            (TypeMapping::Type(concrete), TypeKind::Interface(name)) => {
                debug!("interface {name} maps to {concrete}");
                self.interface_mappings.insert(source, concrete);
            }
            (mapping, _) => {
                debug!("type mapping registered for {source}");
                self.type_mappings.insert(source, mapping);
            }
        }
    }

    pub fn type_mapping(&self, ty: TypeHandle) -> Option<&TypeMapping> {
        self.type_mappings.get(&ty)
    }

    pub fn interface_mapping(&self, ty: TypeHandle) -> Option<TypeHandle> {
        self.interface_mappings.get(&ty).copied()
    }

    pub fn resolve(&self, ty: TypeHandle) -> Option<&RegistryEntry> {
        self.entries.get(&ty)
    }

    pub fn name_for(&self, ty: TypeHandle) -> Option<&str> {
        self.resolve(ty).map(|e| e.canonical_name.as_str())
    }

    /// Reserve a component name so that no registered type is given it.
    pub fn reserve_name(&mut self, name: &str) {
        self.used_names.insert(name.to_string());
    }

    /// Register `ty` as pending and allocate its component name.
    pub fn begin(&mut self, ty: TypeHandle, name: &TypeName, strip_namespace: bool) -> String {
        let base = component_name(name, strip_namespace);
        let canonical = unique_name(&base, &mut self.used_names);
        if canonical != base {
            debug!("component name {base} is taken, using {canonical} for {ty}");
        } else {
            debug!("registering {ty} as {canonical}");
        }
        self.allocated.push(canonical.clone());
        self.entries.insert(
            ty,
            RegistryEntry {
                canonical_name: canonical.clone(),
                schema: None,
                state: EntryState::Pending,
            },
        );
        canonical
    }

    /// Store the finished schema of a pending entry.
    pub fn complete(&mut self, ty: TypeHandle, schema: SchemaOrRef) -> Result<()> {
        let Some(entry) = self.entries.get_mut(&ty) else {
            return Err(ReflectError::SelfReference(ty.to_string()));
        };
        if schema.ref_name() == Some(entry.canonical_name.as_str()) {
            return Err(ReflectError::SelfReference(entry.canonical_name.clone()));
        }
        entry.schema = Some(schema);
        entry.state = EntryState::Complete;
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.entries.len(),
            allocated: self.allocated.len(),
        }
    }

    /// Drop every entry registered since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        if self.entries.len() > checkpoint.entries {
            debug!(
                "discarding {} registry entries",
                self.entries.len() - checkpoint.entries
            );
        }
        self.entries.truncate(checkpoint.entries);
        for name in self.allocated.drain(checkpoint.allocated..) {
            self.used_names.remove(&name);
        }
    }

    /// Completed components registered since `checkpoint`, in registration order.
    pub fn registered_since(
        &self,
        checkpoint: Checkpoint,
    ) -> impl Iterator<Item = (&str, &SchemaOrRef)> {
        self.entries
            .values()
            .skip(checkpoint.entries)
            .filter_map(|e| Some((e.canonical_name.as_str(), e.schema.as_ref()?)))
    }

    /// Adopt memoized entries and mappings of another registry whose
    /// components were merged. Entries are only taken over when `accepted`
    /// confirms the component under that name is the same definition.
    pub(crate) fn absorb(
        &mut self,
        other: Registry,
        accepted: impl Fn(&str, &SchemaOrRef) -> bool,
    ) {
        for (ty, entry) in other.entries {
            let Some(schema) = entry.schema.as_ref() else {
                continue;
            };
            if entry.state == EntryState::Complete
                && !self.entries.contains_key(&ty)
                && accepted(&entry.canonical_name, schema)
            {
                self.entries.insert(ty, entry);
            }
        }
        for (ty, mapping) in other.type_mappings {
            self.type_mappings.entry(ty).or_insert(mapping);
        }
        for (ty, concrete) in other.interface_mappings {
            self.interface_mappings.entry(ty).or_insert(concrete);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordDef, TypeKind};

    struct Alpha;
    struct Beta;

    impl Reflect for Alpha {
        fn describe() -> TypeKind {
            TypeKind::Record(RecordDef::new(TypeName::new("app", "Item")))
        }
    }

    impl Reflect for Beta {
        fn describe() -> TypeKind {
            TypeKind::Record(RecordDef::new(TypeName::new("app", "Item")))
        }
    }

    fn name(ty: TypeHandle) -> TypeName {
        ty.kind().type_name().cloned().unwrap()
    }

    #[test]
    fn test_collisions_get_suffix_in_registration_order() {
        let mut registry = Registry::default();
        let a = TypeHandle::of::<Alpha>();
        let b = TypeHandle::of::<Beta>();
        assert_eq!(registry.begin(a, &name(a), false), "AppItem");
        assert_eq!(registry.begin(b, &name(b), false), "AppItem2");
        assert_eq!(registry.name_for(a), Some("AppItem"));
        assert_eq!(registry.name_for(b), Some("AppItem2"));
    }

    #[test]
    fn test_pending_then_complete() {
        let mut registry = Registry::default();
        let a = TypeHandle::of::<Alpha>();
        registry.begin(a, &name(a), false);
        assert_eq!(registry.resolve(a).unwrap().state, EntryState::Pending);
        registry.complete(a, Schema::object().into()).unwrap();
        let entry = registry.resolve(a).unwrap();
        assert_eq!(entry.state, EntryState::Complete);
        assert_eq!(entry.schema, Some(SchemaOrRef::from(Schema::object())));
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut registry = Registry::default();
        let a = TypeHandle::of::<Alpha>();
        let canonical = registry.begin(a, &name(a), false);
        let err = registry
            .complete(a, SchemaOrRef::component(&canonical))
            .unwrap_err();
        assert!(matches!(err, ReflectError::SelfReference(n) if n == "AppItem"));
    }

    #[test]
    fn test_rollback_releases_names() {
        let mut registry = Registry::default();
        let a = TypeHandle::of::<Alpha>();
        let b = TypeHandle::of::<Beta>();
        registry.begin(a, &name(a), false);
        registry.complete(a, Schema::object().into()).unwrap();

        let checkpoint = registry.checkpoint();
        registry.begin(b, &name(b), false);
        registry.rollback(checkpoint);

        assert!(registry.resolve(b).is_none());
        assert!(registry.resolve(a).is_some());
        assert_eq!(registry.registered_since(checkpoint).count(), 0);
        assert_eq!(registry.begin(b, &name(b), false), "AppItem2");
    }

    #[test]
    fn test_reserved_names_are_skipped() {
        let mut registry = Registry::default();
        registry.reserve_name("AppItem");
        let a = TypeHandle::of::<Alpha>();
        assert_eq!(registry.begin(a, &name(a), false), "AppItem2");
    }

    #[test]
    fn test_schema_mapping_is_stored_for_non_interfaces() {
        let mut registry = Registry::default();
        let a = TypeHandle::of::<Alpha>();
        registry.add_type_mapping(a, TypeMapping::to::<Beta>());
        assert!(matches!(
            registry.type_mapping(a),
            Some(TypeMapping::Type(t)) if *t == TypeHandle::of::<Beta>()
        ));
        assert!(registry.interface_mapping(a).is_none());
    }
}
