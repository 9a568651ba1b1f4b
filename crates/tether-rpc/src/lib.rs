//! # tether-rpc
//!
//! A synchronous, transport-agnostic JSON-RPC engine. A server exposes named handler objects
//! through capability interfaces; a client calls those interfaces through a generated stub as if
//! they were local.
//!
//! ## Features
//! - `#[rpc_interface]` turns a trait into a remotely callable capability interface
//! - `#[derive(RpcType)]` describes data types ahead of time for validation and signatures
//! - A handler registry that locks itself before the first dispatch
//! - JSON-RPC 2.0 style error envelopes with the standard error codes
//! - Transport agnostic: bring your own bytes in and bytes out
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_rpc::prelude::*;
//!
//! #[rpc_interface]
//! pub trait Calculator {
//!     fn add(&self, a: i32, b: i32) -> RpcResult<i32>;
//! }
//!
//! struct Math;
//!
//! impl Calculator for Math {
//!     fn add(&self, a: i32, b: i32) -> RpcResult<i32> {
//!         Ok(a + b)
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = Arc::new(JsonRpcExecutor::new());
//! executor.add_handler("math", Arc::new(Math), vec![Capability::of::<dyn Calculator>()])?;
//!
//! let stub = JsonRpcInvoker::new().bind(
//!     Arc::new(LoopbackTransport::new(executor)),
//!     "math",
//!     vec![InterfaceDescriptor::of::<dyn Calculator>()],
//! )?;
//! assert_eq!(stub.add(2, 3)?, 5);
//! # Ok(())
//! # }
//! ```

// Generated code refers to this crate by name, including inside the crate itself.
extern crate self as tether_rpc;

pub mod checker;
pub mod codec;
pub mod config;
pub mod error;
pub mod executor;
pub mod interface;
pub mod invoker;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;
pub mod typeinfo;
pub mod types;

mod introspection;

// Re-export main types
pub use checker::{AllowAllTypeChecker, SerdeTypeChecker, TypeChecker};
pub use codec::Codec;
pub use config::{ExecutorConfig, InvokerConfig, TypeChecking};
pub use error::{
    ConfigurationError, JsonRpcErrorCode, RemoteError, RpcError, RpcResult, TransportError,
    TypeError,
};
pub use executor::JsonRpcExecutor;
pub use interface::{Capability, InterfaceDescriptor, MethodDescriptor, RpcInterface, Serve};
pub use introspection::RpcIntrospection;
pub use invoker::{JsonRpcInvoker, RemoteStub};
pub use request::JsonRpcRequest;
pub use response::{JsonRpcErrorResponse, JsonRpcMessage, JsonRpcResponse};
pub use transport::{ClientTransport, LineTransport, LoopbackTransport, ServerTransport};
pub use typeinfo::{FieldInfo, RpcType, StructInfo, TypeInfo, TypeKind, TypeRef};
pub use types::{JsonRpcVersion, RequestId};

pub use tether_rpc_derive::{RpcType, rpc_interface};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::Value;
}

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32000;
    pub const SERVER_ERROR_END: i64 = -32099;

    /// Code `n` of the server-defined range, counting down from `-32000`.
    pub const fn server_error(n: u8) -> i64 {
        SERVER_ERROR_START - n as i64
    }

    /// A handler (or parameter decoding) failed without a structured remote error.
    pub const UNHANDLED_HANDLER_ERROR: i64 = server_error(0);
    /// The executor itself failed while producing a response.
    pub const EXECUTOR_ERROR: i64 = server_error(1);
}
