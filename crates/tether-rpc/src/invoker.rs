//! Client side: typed stubs that turn interface calls into requests.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::checker::TypeChecker;
use crate::codec::Codec;
use crate::config::InvokerConfig;
use crate::error::{ConfigurationError, RpcError, RpcResult};
use crate::interface::InterfaceDescriptor;
use crate::request::{JsonRpcRequest, is_identifier};
use crate::response::parse_response;
use crate::transport::ClientTransport;
use crate::typeinfo::{RpcType, TypeInfo};
use crate::types::RequestId;

/// Builds [`RemoteStub`]s bound to a transport and a remote handler name.
pub struct JsonRpcInvoker {
    checker: Arc<dyn TypeChecker>,
    codec: Codec,
    config: InvokerConfig,
}

impl Default for JsonRpcInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRpcInvoker {
    pub fn new() -> Self {
        Self::with_config(InvokerConfig::default())
    }

    pub fn with_config(config: InvokerConfig) -> Self {
        Self::with_type_checker(config.type_checking.checker(), config)
    }

    /// Build an invoker around an explicit checker. `config.type_checking` is ignored.
    pub fn with_type_checker(checker: Arc<dyn TypeChecker>, config: InvokerConfig) -> Self {
        Self {
            checker,
            codec: Codec::new(config.max_param_depth),
            config,
        }
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Validate `interfaces` and return a stub calling `handler` through `transport`.
    ///
    /// The stub implements every interface trait; calling it through an interface that was not
    /// listed here fails with [`RpcError::NotBound`].
    pub fn bind(
        &self,
        transport: Arc<dyn ClientTransport>,
        handler: &str,
        interfaces: Vec<InterfaceDescriptor>,
    ) -> Result<RemoteStub, ConfigurationError> {
        if interfaces.is_empty() {
            return Err(ConfigurationError::NoInterfaces);
        }
        if !is_identifier(handler) {
            return Err(ConfigurationError::InvalidHandlerName(handler.to_string()));
        }
        for interface in &interfaces {
            self.checker.check_interface(interface).map_err(|source| {
                ConfigurationError::InvalidInterface {
                    interface: interface.name.to_string(),
                    source,
                }
            })?;
        }

        Ok(RemoteStub {
            inner: Arc::new(StubInner {
                transport,
                handler: handler.to_string(),
                interfaces,
                codec: self.codec,
            }),
        })
    }
}

impl fmt::Debug for JsonRpcInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcInvoker")
            .field("checker", &self.checker)
            .field("config", &self.config)
            .finish()
    }
}

/// Client stub for one remote handler. Cheap to clone.
#[derive(Clone)]
pub struct RemoteStub {
    inner: Arc<StubInner>,
}

struct StubInner {
    transport: Arc<dyn ClientTransport>,
    handler: String,
    interfaces: Vec<InterfaceDescriptor>,
    codec: Codec,
}

impl RemoteStub {
    pub fn handler_name(&self) -> &str {
        &self.inner.handler
    }

    pub fn interfaces(&self) -> &[InterfaceDescriptor] {
        &self.inner.interfaces
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.inner
            .interfaces
            .iter()
            .any(|bound| bound.name == interface)
    }

    #[doc(hidden)]
    pub fn encode_param<T: Serialize + ?Sized>(&self, value: &T, index: usize) -> RpcResult<Value> {
        self.inner.codec.encode_param(value, index)
    }

    /// Send `<handler>.<method>` with positional `params` and decode the result as `R`.
    #[doc(hidden)]
    pub fn call<R>(
        &self,
        interface: &'static str,
        method: &'static str,
        params: Vec<Value>,
    ) -> RpcResult<R>
    where
        R: DeserializeOwned + RpcType,
    {
        if !self.implements(interface) {
            return Err(RpcError::NotBound {
                interface: interface.to_string(),
            });
        }

        let request = JsonRpcRequest::new(
            RequestId::random(),
            format!("{}.{}", self.inner.handler, method),
            params,
        );
        let request =
            serde_json::to_string(&request).map_err(|e| RpcError::encode("request", e))?;

        debug!("JSON-RPC >> {request}");
        let response = self.inner.transport.call(&request).map_err(|e| {
            warn!(error = %e, "unable to get data from transport");
            RpcError::Transport(e)
        })?;
        debug!("JSON-RPC << {response}");

        let result = parse_response(&response)?;
        if TypeInfo::of::<R>().is_void() {
            return self.inner.codec.decode_result(Value::Null);
        }
        self.inner.codec.decode_result(result)
    }
}

impl fmt::Debug for RemoteStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStub")
            .field("handler", &self.inner.handler)
            .field(
                "interfaces",
                &self
                    .inner
                    .interfaces
                    .iter()
                    .map(|interface| interface.name)
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
