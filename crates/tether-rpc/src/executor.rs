//! Server side dispatch: one request/response cycle per `execute` call.

use serde_json::Value;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::checker::TypeChecker;
use crate::codec::Codec;
use crate::config::ExecutorConfig;
use crate::error::{ConfigurationError, RemoteError, RpcError, diagnostic_trace};
use crate::interface::Capability;
use crate::introspection::{RpcIntrospection, SystemHandler};
use crate::registry::{HandlerEntry, HandlerTable, Registry};
use crate::request::{IncomingRequest, is_identifier};
use crate::response::JsonRpcMessage;
use crate::transport::ServerTransport;

/// Name the built-in introspection handler is registered under
pub const SYSTEM_HANDLER: &str = "system";

// Written when even the fallback error envelope cannot be serialized.
const LAST_RESORT_RESPONSE: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32001,"message":"unable to serialize response"}}"#;

/// Dispatches requests to registered handlers.
///
/// Handlers can be added until the first request is dispatched; from then on the registry is
/// locked and read without synchronization.
pub struct JsonRpcExecutor {
    registry: Arc<Registry>,
    checker: Arc<dyn TypeChecker>,
    codec: Codec,
    config: ExecutorConfig,
}

impl Default for JsonRpcExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRpcExecutor {
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Self::with_type_checker(config.type_checking.checker(), config)
    }

    /// Build an executor around an explicit checker. `config.type_checking` is ignored.
    pub fn with_type_checker(checker: Arc<dyn TypeChecker>, config: ExecutorConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let system = HandlerEntry::bind(
            checker.as_ref(),
            Arc::new(SystemHandler::new(&registry)),
            vec![Capability::of::<dyn RpcIntrospection>()],
        );
        registry.install(SYSTEM_HANDLER, system);

        Self {
            registry,
            checker,
            codec: Codec::new(config.max_result_depth),
            config,
        }
    }

    /// Register `handler` under `name`, exposing the methods of every capability.
    pub fn add_handler<H>(
        &self,
        name: &str,
        handler: Arc<H>,
        capabilities: Vec<Capability<H>>,
    ) -> Result<(), ConfigurationError>
    where
        H: ?Sized + Send + Sync + 'static,
    {
        if self.registry.is_locked() {
            return Err(ConfigurationError::Locked);
        }
        if !is_identifier(name) {
            return Err(ConfigurationError::InvalidHandlerName(name.to_string()));
        }

        let entry = HandlerEntry::new(self.checker.as_ref(), handler, capabilities)?;
        self.registry.insert(name, entry)
    }

    pub fn is_locked(&self) -> bool {
        self.registry.is_locked()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn type_checker(&self) -> &Arc<dyn TypeChecker> {
        &self.checker
    }

    /// Run one cycle: read a request, dispatch it and write the response.
    ///
    /// Never fails. Every problem becomes an error envelope, and a response that cannot be
    /// written is logged and dropped.
    pub fn execute(&self, transport: &mut dyn ServerTransport) {
        let table = self.registry.lock();

        let response = match transport.read_request() {
            Ok(request) => self.respond(&table, &request),
            Err(e) => {
                warn!(error = %e, "unable to read request");
                let message = JsonRpcMessage::error(
                    Value::Null,
                    RemoteError::parse_error(Some(self.detail(&e))),
                );
                self.serialize(&message)
            }
        };

        if let Err(e) = transport.write_response(&response) {
            error!(error = %e, response = %response, "unable to write response");
        }
    }

    /// Dispatch a request that is already in hand and return the response text.
    pub fn handle(&self, request: &str) -> String {
        let table = self.registry.lock();
        self.respond(&table, request)
    }

    /// Every `"<handler>.<method>"`, sorted.
    pub fn list_methods(&self) -> Vec<String> {
        self.registry.list_methods()
    }

    /// Sorted signatures of `"<handler>.<method>"`.
    pub fn method_signature(&self, method: &str) -> Result<Vec<String>, RemoteError> {
        self.registry.method_signature(method)
    }

    fn respond(&self, table: &HandlerTable, request: &str) -> String {
        debug!("JSON-RPC >> {request}");
        let response = self.serialize(&self.process(table, request));
        debug!("JSON-RPC << {response}");
        response
    }

    fn process(&self, table: &HandlerTable, request: &str) -> JsonRpcMessage {
        let envelope: Value = match serde_json::from_str(request) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "unable to parse json-rpc request");
                return JsonRpcMessage::error(
                    Value::Null,
                    RemoteError::parse_error(Some(self.detail(&e))),
                );
            }
        };

        let object = match envelope {
            Value::Object(object) => object,
            other => {
                warn!("request is not a JSON object");
                return JsonRpcMessage::error(
                    Value::Null,
                    RemoteError::invalid_request(
                        "unable to read request",
                        Some(format!("expected a JSON object, found {other}")),
                    ),
                );
            }
        };

        let id = object.get("id").cloned().unwrap_or(Value::Null);
        let request = match IncomingRequest::from_object(object) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "unable to read request");
                return JsonRpcMessage::error(id, e);
            }
        };

        match self.dispatch(table, &request.handler, &request.method, request.params) {
            Ok(result) => JsonRpcMessage::success(request.id, result),
            Err(e) => JsonRpcMessage::error(request.id, e),
        }
    }

    fn dispatch(
        &self,
        table: &HandlerTable,
        handler: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RemoteError> {
        let bound = table
            .get(handler)
            .and_then(|entry| entry.resolve(method, params.len()))
            .ok_or_else(RemoteError::method_not_found)?;

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| bound.invoke(params, &self.codec)));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(RpcError::Panic(panic_message(payload))),
        };

        result.map_err(|e| {
            warn!(
                handler,
                method,
                interface = bound.interface,
                error = %e,
                "exception occurred while executing"
            );
            e.into_remote(self.config.include_diagnostics)
        })
    }

    fn serialize(&self, message: &JsonRpcMessage) -> String {
        match message.to_json_string() {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "unable to serialize response");
                let fallback = JsonRpcMessage::error(
                    message.id().clone(),
                    RemoteError::server_error(
                        1,
                        Some("unable to serialize response".to_string()),
                        Some(e.to_string()),
                    ),
                );
                fallback
                    .to_json_string()
                    .unwrap_or_else(|_| LAST_RESORT_RESPONSE.to_string())
            }
        }
    }

    fn detail(&self, error: &(dyn StdError + 'static)) -> String {
        if self.config.include_diagnostics {
            diagnostic_trace(error)
        } else {
            error.to_string()
        }
    }
}

impl fmt::Debug for JsonRpcExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcExecutor")
            .field("registry", &self.registry)
            .field("checker", &self.checker)
            .field("config", &self.config)
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
    }
}
