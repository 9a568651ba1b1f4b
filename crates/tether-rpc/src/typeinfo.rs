//! Ahead-of-time type descriptors.
//!
//! Every type that crosses the wire implements [`RpcType`], usually through
//! `#[derive(RpcType)]`. The descriptor is computed fresh on each call and references nested
//! types through [`TypeRef`] function pointers, so recursive types describe themselves lazily.

use std::any::{TypeId, type_name};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// Lazily produces the descriptor of a nested type
pub type TypeRef = fn() -> TypeInfo;

/// A type that can describe itself for validation and signature rendering.
pub trait RpcType: 'static {
    fn type_info() -> TypeInfo;
}

/// Descriptor of a single type
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    /// Fully qualified Rust type name
    pub name: &'static str,
    pub kind: TypeKind,
}

impl TypeInfo {
    pub fn new<T: ?Sized + 'static>(kind: TypeKind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind,
        }
    }

    pub fn of<T: RpcType>() -> Self {
        T::type_info()
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }
}

/// Classification of a type
#[derive(Debug, Clone)]
pub enum TypeKind {
    Void,
    Boolean,
    Integer,
    Float,
    Char,
    String,
    /// Date and time scalars
    Date,
    /// Arrays, vectors and sets of the element type
    Sequence(TypeRef),
    /// Transparent wrapper (`Option`, `Box`, `Rc`, `Arc`, `RefCell`, newtypes)
    Wrapper(TypeRef),
    /// String-keyed map of the value type
    Map(TypeRef),
    Struct(StructInfo),
    /// Untyped or trait-object data with no fixed shape
    Dynamic,
}

/// Shape of a record type
#[derive(Debug, Clone)]
pub struct StructInfo {
    pub fields: Vec<FieldInfo>,
    /// Whether the decoder can build a value of this type
    pub constructible: bool,
    pub is_abstract: bool,
    /// Has no name a peer could refer to. Only hand-written `RpcType` impls set this;
    /// `#[derive(RpcType)]` always describes named types.
    pub anonymous: bool,
    /// Still generic over unresolved type parameters. Only hand-written `RpcType` impls set
    /// this; `#[derive(RpcType)]` bounds type parameters instead, so derived types are concrete.
    pub generic: bool,
}

impl StructInfo {
    /// A concrete, constructible record with the given fields.
    pub fn new(fields: Vec<FieldInfo>) -> Self {
        Self {
            fields,
            constructible: true,
            is_abstract: false,
            anonymous: false,
            generic: false,
        }
    }

    pub fn constructible(mut self, constructible: bool) -> Self {
        self.constructible = constructible;
        self
    }

    pub fn is_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// For hand-written impls; the derive never marks a type anonymous.
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    /// For hand-written impls; the derive never marks a type generic.
    pub fn generic(mut self, generic: bool) -> Self {
        self.generic = generic;
        self
    }
}

/// A single record field
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: &'static str,
    pub ty: TypeRef,
    /// Cannot be populated when decoding
    pub readonly: bool,
    /// Never serialized (transient)
    pub skipped: bool,
}

impl FieldInfo {
    pub fn new(name: &'static str, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            readonly: false,
            skipped: false,
        }
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn skipped(mut self, skipped: bool) -> Self {
        self.skipped = skipped;
        self
    }
}

macro_rules! scalar_rpc_type {
    ($kind:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl RpcType for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::new::<Self>(TypeKind::$kind)
                }
            }
        )+
    };
}

scalar_rpc_type!(Void => ());
scalar_rpc_type!(Boolean => bool);
scalar_rpc_type!(Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
scalar_rpc_type!(Float => f32, f64);
scalar_rpc_type!(Char => char);
scalar_rpc_type!(String => String);
scalar_rpc_type!(Dynamic => serde_json::Value);

#[cfg(feature = "chrono")]
scalar_rpc_type!(
    Date => chrono::DateTime<chrono::Utc>,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::NaiveTime,
);

macro_rules! generic_rpc_type {
    ($kind:ident => $($ty:ident),+ $(,)?) => {
        $(
            impl<T: RpcType> RpcType for $ty<T> {
                fn type_info() -> TypeInfo {
                    TypeInfo::new::<Self>(TypeKind::$kind(T::type_info))
                }
            }
        )+
    };
}

generic_rpc_type!(Sequence => Vec, VecDeque, HashSet, BTreeSet);
generic_rpc_type!(Wrapper => Option, Box, Rc, Arc, RefCell);

impl<T: RpcType, const N: usize> RpcType for [T; N] {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Self>(TypeKind::Sequence(T::type_info))
    }
}

impl<V: RpcType> RpcType for HashMap<String, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Self>(TypeKind::Map(V::type_info))
    }
}

impl<V: RpcType> RpcType for BTreeMap<String, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Self>(TypeKind::Map(V::type_info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(crate::RpcType)]
    struct Envelope<T> {
        body: T,
    }

    #[test]
    fn test_derived_records_are_named_and_concrete() {
        let TypeKind::Struct(record) = TypeInfo::of::<Envelope<String>>().kind else {
            panic!("expected a record");
        };
        assert!(!record.anonymous);
        assert!(!record.generic);

        let record = StructInfo::new(Vec::new()).anonymous(true).generic(true);
        assert!(record.anonymous && record.generic);
    }

    #[test]
    fn test_scalar_kinds() {
        assert!(TypeInfo::of::<()>().is_void());
        assert!(matches!(TypeInfo::of::<u8>().kind, TypeKind::Integer));
        assert!(matches!(TypeInfo::of::<f32>().kind, TypeKind::Float));
        assert!(matches!(TypeInfo::of::<char>().kind, TypeKind::Char));
        assert!(matches!(TypeInfo::of::<String>().kind, TypeKind::String));
        assert!(matches!(
            TypeInfo::of::<serde_json::Value>().kind,
            TypeKind::Dynamic
        ));
    }

    #[test]
    fn test_nested_kinds_resolve_lazily() {
        let info = TypeInfo::of::<Vec<Option<i64>>>();
        let TypeKind::Sequence(element) = info.kind else {
            panic!("expected a sequence");
        };
        let TypeKind::Wrapper(inner) = element().kind else {
            panic!("expected a wrapper");
        };
        assert_eq!(inner().id, TypeId::of::<i64>());
    }

    #[test]
    fn test_maps_describe_their_values() {
        let info = TypeInfo::of::<BTreeMap<String, bool>>();
        let TypeKind::Map(value) = info.kind else {
            panic!("expected a map");
        };
        assert!(matches!(value().kind, TypeKind::Boolean));
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn test_dates() {
        assert!(matches!(
            TypeInfo::of::<chrono::DateTime<chrono::Utc>>().kind,
            TypeKind::Date
        ));
    }
}
