//! # tether-rpc Prelude
//!
//! Re-exports of what most servers and clients need.
//!
//! ```rust
//! use tether_rpc::prelude::*;
//! ```

// Defining interfaces and data types
pub use crate::{RpcType, rpc_interface};
pub use crate::error::{RemoteError, RpcError, RpcResult};

// Server side
pub use crate::executor::JsonRpcExecutor;
pub use crate::interface::{Capability, InterfaceDescriptor};

// Client side
pub use crate::invoker::{JsonRpcInvoker, RemoteStub};

// Transports
pub use crate::transport::{ClientTransport, LineTransport, LoopbackTransport, ServerTransport};

pub use crate::config::{ExecutorConfig, InvokerConfig, TypeChecking};
pub use crate::introspection::RpcIntrospection;
