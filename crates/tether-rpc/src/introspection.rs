use std::sync::{Arc, Weak};

use crate::error::{RemoteError, RpcError, RpcResult};
use crate::registry::Registry;
use crate::rpc_interface;

/// Built-in capability registered under `system` in every executor.
#[rpc_interface]
pub trait RpcIntrospection {
    /// Every `"<handler>.<method>"`, sorted
    #[rpc(name = "listMethods")]
    fn list_methods(&self) -> RpcResult<Vec<String>>;

    /// Sorted signatures of one `"<handler>.<method>"`
    #[rpc(name = "methodSignature")]
    fn method_signature(&self, method: String) -> RpcResult<Vec<String>>;
}

/// Answers introspection calls from the registry it is registered in.
pub(crate) struct SystemHandler {
    registry: Weak<Registry>,
}

impl SystemHandler {
    pub(crate) fn new(registry: &Arc<Registry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }

    fn registry(&self) -> RpcResult<Arc<Registry>> {
        self.registry.upgrade().ok_or_else(|| {
            RpcError::Remote(RemoteError::with_code(
                crate::JsonRpcErrorCode::InternalError,
                "executor has been dropped",
            ))
        })
    }
}

impl RpcIntrospection for SystemHandler {
    fn list_methods(&self) -> RpcResult<Vec<String>> {
        Ok(self.registry()?.list_methods())
    }

    fn method_signature(&self, method: String) -> RpcResult<Vec<String>> {
        Ok(self.registry()?.method_signature(&method)?)
    }
}
