//! [`Reflect`] implementations for standard library and `serde_json` types.

use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, SyncSender};

use indexmap::{IndexMap, IndexSet};

use super::{Primitive, Reflect, TypeHandle, TypeKind, UnsupportedShape};

macro_rules! reflect_primitive {
    ($($ty:ty => $prim:ident),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn describe() -> TypeKind {
                    TypeKind::Primitive(Primitive::$prim)
                }
            }
        )*
    };
}

reflect_primitive! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    isize => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    usize => Uint64,
    f32 => Float32,
    f64 => Float64,
    char => String,
    str => String,
    String => String,
}

/// An uploaded file, e.g. one part of a multipart form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Reflect for FileUpload {
    fn describe() -> TypeKind {
        TypeKind::Primitive(Primitive::File)
    }
}

impl Reflect for serde_json::Value {
    fn describe() -> TypeKind {
        TypeKind::Any
    }
}

impl Reflect for serde_json::Map<String, serde_json::Value> {
    fn describe() -> TypeKind {
        TypeKind::Map {
            key: TypeHandle::of::<String>(),
            value: TypeHandle::of::<serde_json::Value>(),
        }
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn describe() -> TypeKind {
        TypeKind::Optional(TypeHandle::of::<T>())
    }
}

macro_rules! reflect_transparent {
    ($($wrapper:ident),*) => {
        $(
            impl<T: Reflect + ?Sized> Reflect for $wrapper<T> {
                fn describe() -> TypeKind {
                    T::describe()
                }

                fn handle() -> TypeHandle {
                    T::handle()
                }
            }
        )*
    };
}

reflect_transparent!(Box, Rc, Arc);

/// Sequences of `u8` are byte strings, everything else is an array.
fn sequence_of<T: Reflect>() -> TypeKind {
    if TypeId::of::<T>() == TypeId::of::<u8>() {
        TypeKind::Primitive(Primitive::Bytes)
    } else {
        TypeKind::Array(TypeHandle::of::<T>())
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn describe() -> TypeKind {
        sequence_of::<T>()
    }
}

impl<T: Reflect> Reflect for [T] {
    fn describe() -> TypeKind {
        sequence_of::<T>()
    }
}

macro_rules! reflect_sequence {
    ($($seq:ident),*) => {
        $(
            impl<T: Reflect> Reflect for $seq<T> {
                fn describe() -> TypeKind {
                    TypeKind::Array(TypeHandle::of::<T>())
                }
            }
        )*
    };
}

reflect_sequence!(VecDeque, LinkedList, BTreeSet);

impl<T: Reflect, S: 'static> Reflect for HashSet<T, S> {
    fn describe() -> TypeKind {
        TypeKind::Array(TypeHandle::of::<T>())
    }
}

impl<T: Reflect, S: 'static> Reflect for IndexSet<T, S> {
    fn describe() -> TypeKind {
        TypeKind::Array(TypeHandle::of::<T>())
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn describe() -> TypeKind {
        TypeKind::FixedArray {
            item: TypeHandle::of::<T>(),
            len: N,
        }
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn describe() -> TypeKind {
        TypeKind::Map {
            key: TypeHandle::of::<K>(),
            value: TypeHandle::of::<V>(),
        }
    }
}

impl<K: Reflect, V: Reflect, S: 'static> Reflect for HashMap<K, V, S> {
    fn describe() -> TypeKind {
        TypeKind::Map {
            key: TypeHandle::of::<K>(),
            value: TypeHandle::of::<V>(),
        }
    }
}

impl<K: Reflect, V: Reflect, S: 'static> Reflect for IndexMap<K, V, S> {
    fn describe() -> TypeKind {
        TypeKind::Map {
            key: TypeHandle::of::<K>(),
            value: TypeHandle::of::<V>(),
        }
    }
}

impl<T: ?Sized + 'static> Reflect for *const T {
    fn describe() -> TypeKind {
        TypeKind::Unsupported(UnsupportedShape::RawPointer)
    }
}

impl<T: ?Sized + 'static> Reflect for *mut T {
    fn describe() -> TypeKind {
        TypeKind::Unsupported(UnsupportedShape::RawPointer)
    }
}

macro_rules! reflect_channel {
    ($($chan:ident),*) => {
        $(
            impl<T: 'static> Reflect for $chan<T> {
                fn describe() -> TypeKind {
                    TypeKind::Unsupported(UnsupportedShape::Channel)
                }
            }
        )*
    };
}

reflect_channel!(Sender, SyncSender, Receiver);

macro_rules! reflect_fn_pointer {
    ($($arg:ident),*) => {
        impl<R: 'static, $($arg: 'static),*> Reflect for fn($($arg),*) -> R {
            fn describe() -> TypeKind {
                TypeKind::Unsupported(UnsupportedShape::Function)
            }
        }
    };
}

reflect_fn_pointer!();
reflect_fn_pointer!(A);
reflect_fn_pointer!(A, B);
reflect_fn_pointer!(A, B, C);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_sequences() {
        assert!(matches!(
            TypeHandle::of::<Vec<u8>>().kind(),
            TypeKind::Primitive(Primitive::Bytes)
        ));
        assert!(matches!(
            TypeHandle::of::<Vec<u16>>().kind(),
            TypeKind::Array(_)
        ));
    }

    #[test]
    fn test_fixed_array() {
        match TypeHandle::of::<[u8; 16]>().kind() {
            TypeKind::FixedArray { item, len } => {
                assert_eq!(item, TypeHandle::of::<u8>());
                assert_eq!(len, 16);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_shapes() {
        assert!(matches!(
            TypeHandle::of::<fn(i32) -> i32>().kind(),
            TypeKind::Unsupported(UnsupportedShape::Function)
        ));
        assert!(matches!(
            TypeHandle::of::<Sender<String>>().kind(),
            TypeKind::Unsupported(UnsupportedShape::Channel)
        ));
        assert!(matches!(
            TypeHandle::of::<*const u8>().kind(),
            TypeKind::Unsupported(UnsupportedShape::RawPointer)
        ));
    }

    #[test]
    fn test_smart_pointers_are_transparent() {
        assert_eq!(TypeHandle::of::<Arc<str>>(), TypeHandle::of::<str>());
        assert_eq!(TypeHandle::of::<Rc<Box<i64>>>(), TypeHandle::of::<i64>());
    }
}
