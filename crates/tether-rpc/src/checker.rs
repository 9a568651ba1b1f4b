//! Type validation for capability interfaces.

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt::Debug;

use crate::error::TypeError;
use crate::interface::{InterfaceDescriptor, MethodDescriptor};
use crate::typeinfo::{TypeInfo, TypeKind};

/// Decides whether types can cross the wire and names them for signatures.
pub trait TypeChecker: Send + Sync + Debug {
    /// Strict validation, naming the offending type (and field) on failure.
    fn check_type(&self, info: &TypeInfo) -> Result<(), TypeError>;

    /// Canonical name used when rendering method signatures.
    fn type_name(&self, info: &TypeInfo) -> String;

    fn is_valid_type(&self, info: &TypeInfo) -> bool {
        self.check_type(info).is_ok()
    }

    /// Check the return type, then every parameter in order.
    fn check_method(&self, method: &MethodDescriptor) -> Result<(), TypeError> {
        self.check_type(&(method.returns)())
            .map_err(|source| TypeError::InvalidReturn {
                method: method.name.to_string(),
                source: Box::new(source),
            })?;

        for (index, param) in method.params.iter().enumerate() {
            self.check_type(&param())
                .map_err(|source| TypeError::InvalidParam {
                    method: method.name.to_string(),
                    index,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    fn check_interface(&self, interface: &InterfaceDescriptor) -> Result<(), TypeError> {
        interface
            .methods
            .iter()
            .try_for_each(|method| self.check_method(method))
    }

    fn is_valid_interface(&self, interface: &InterfaceDescriptor) -> bool {
        self.check_interface(interface).is_ok()
    }
}

/// Validator matching what `serde` can round-trip through JSON.
///
/// Scalars, dates and sequences of valid types are always accepted. Records must be
/// constructible, concrete and non-generic, and every serialized field must be writable and
/// itself valid. A composite type already seen during the current check is accepted without
/// descending again, so self-referential types terminate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeTypeChecker;

impl SerdeTypeChecker {
    pub fn new() -> Self {
        Self
    }

    fn check(&self, info: &TypeInfo, visited: &mut HashSet<TypeId>) -> Result<(), TypeError> {
        let record = match &info.kind {
            TypeKind::Void
            | TypeKind::Boolean
            | TypeKind::Integer
            | TypeKind::Float
            | TypeKind::Char
            | TypeKind::String
            | TypeKind::Date => return Ok(()),
            TypeKind::Dynamic => {
                return Err(TypeError::Abstract {
                    type_name: info.name.to_string(),
                });
            }
            _ if !visited.insert(info.id) => return Ok(()),
            TypeKind::Sequence(element) | TypeKind::Wrapper(element) | TypeKind::Map(element) => {
                return self.check(&element(), visited);
            }
            TypeKind::Struct(record) => record,
        };

        let type_name = || info.name.to_string();
        if !record.constructible {
            return Err(TypeError::NotConstructible {
                type_name: type_name(),
            });
        }
        if record.is_abstract {
            return Err(TypeError::Abstract {
                type_name: type_name(),
            });
        }
        if record.anonymous {
            return Err(TypeError::Anonymous {
                type_name: type_name(),
            });
        }
        if record.generic {
            return Err(TypeError::Generic {
                type_name: type_name(),
            });
        }

        for field in record.fields.iter().filter(|field| !field.skipped) {
            if field.readonly {
                return Err(TypeError::ReadonlyField {
                    type_name: type_name(),
                    field: field.name.to_string(),
                });
            }
            self.check(&(field.ty)(), visited)
                .map_err(|source| TypeError::InvalidField {
                    type_name: type_name(),
                    field: field.name.to_string(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

impl TypeChecker for SerdeTypeChecker {
    fn check_type(&self, info: &TypeInfo) -> Result<(), TypeError> {
        self.check(info, &mut HashSet::new())
    }

    fn type_name(&self, info: &TypeInfo) -> String {
        wire_name(info, &mut HashSet::new()).to_string()
    }
}

// Wrappers take the name of what they wrap. A wrapper that only wraps itself names a record.
fn wire_name(info: &TypeInfo, wrappers: &mut HashSet<TypeId>) -> &'static str {
    match &info.kind {
        TypeKind::Void => "void",
        TypeKind::Boolean => "boolean",
        TypeKind::Float => "double",
        TypeKind::Integer | TypeKind::Char => "int",
        TypeKind::String => "string",
        TypeKind::Sequence(_) => "array",
        TypeKind::Wrapper(inner) if wrappers.insert(info.id) => wire_name(&inner(), wrappers),
        TypeKind::Wrapper(_)
        | TypeKind::Date
        | TypeKind::Map(_)
        | TypeKind::Struct(_)
        | TypeKind::Dynamic => "struct",
    }
}

/// Accepts every type. Signatures show the Rust type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllTypeChecker;

impl AllowAllTypeChecker {
    pub fn new() -> Self {
        Self
    }
}

impl TypeChecker for AllowAllTypeChecker {
    fn check_type(&self, _info: &TypeInfo) -> Result<(), TypeError> {
        Ok(())
    }

    fn type_name(&self, info: &TypeInfo) -> String {
        info.name.to_string()
    }

    fn check_interface(&self, _interface: &InterfaceDescriptor) -> Result<(), TypeError> {
        Ok(())
    }
}
