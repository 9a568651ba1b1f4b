//! Capability interfaces and their dispatch adapters.
//!
//! `#[rpc_interface]` implements [`RpcInterface`] and [`Serve`] for `dyn Trait`, so the trait
//! object type doubles as the interface's identity on both sides of the wire.

use serde_json::Value;
use std::fmt;

use crate::checker::TypeChecker;
use crate::codec::Codec;
use crate::error::RpcResult;
use crate::typeinfo::{TypeInfo, TypeRef};

/// One remotely callable method of an interface
#[derive(Clone)]
pub struct MethodDescriptor {
    /// Wire name, unique per interface only up to arity
    pub name: &'static str,
    pub params: Vec<TypeRef>,
    pub returns: TypeRef,
}

impl MethodDescriptor {
    pub fn new(name: &'static str, params: Vec<TypeRef>, returns: TypeRef) -> Self {
        Self {
            name,
            params,
            returns,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn return_type(&self) -> TypeInfo {
        (self.returns)()
    }

    /// Render `"<return>,<param1>,..."` using the checker's type names.
    pub fn signature(&self, checker: &dyn TypeChecker) -> String {
        std::iter::once(self.returns)
            .chain(self.params.iter().copied())
            .map(|ty| checker.type_name(&ty()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field(
                "params",
                &self.params.iter().map(|ty| ty().name).collect::<Vec<_>>(),
            )
            .field("returns", &(self.returns)().name)
            .finish()
    }
}

/// Name and methods of a capability interface, in declaration order
#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    pub name: &'static str,
    pub methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    pub fn new(name: &'static str, methods: Vec<MethodDescriptor>) -> Self {
        Self { name, methods }
    }

    pub fn of<I: RpcInterface + ?Sized>() -> Self {
        I::descriptor()
    }

    /// First method with the given wire name and arity.
    pub fn find(&self, name: &str, arity: usize) -> Option<(usize, &MethodDescriptor)> {
        self.methods
            .iter()
            .enumerate()
            .find(|(_, method)| method.name == name && method.arity() == arity)
    }
}

/// A trait usable as a capability interface.
pub trait RpcInterface: 'static {
    fn descriptor() -> InterfaceDescriptor;
}

/// Server side adapter: runs method `method` (an index into the descriptor) on `handler`.
pub trait Serve<H: ?Sized>: RpcInterface {
    fn invoke(handler: &H, method: usize, params: Vec<Value>, codec: &Codec) -> RpcResult<Value>;
}

/// Dispatch adapter of a single interface for handlers of type `H`
pub type Invoke<H> = fn(&H, usize, Vec<Value>, &Codec) -> RpcResult<Value>;

/// An interface a handler is registered under, paired with its dispatch adapter.
pub struct Capability<H: ?Sized> {
    descriptor: InterfaceDescriptor,
    invoke: Invoke<H>,
}

impl<H: ?Sized> Capability<H> {
    /// `Capability::of::<dyn Calculator>()`
    pub fn of<I: Serve<H> + ?Sized>() -> Self {
        Self {
            descriptor: I::descriptor(),
            invoke: I::invoke,
        }
    }

    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    pub(crate) fn into_parts(self) -> (InterfaceDescriptor, Invoke<H>) {
        (self.descriptor, self.invoke)
    }
}

impl<H: ?Sized> fmt::Debug for Capability<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("interface", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}
