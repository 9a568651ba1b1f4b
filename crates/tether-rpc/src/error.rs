use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use crate::error_codes;

/// Result type for interface methods on both sides of the wire
pub type RpcResult<T> = Result<T, RpcError>;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(u8), // -32000 - n
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError(n) => error_codes::server_error(*n),
        }
    }
}

/// A structured failure returned from the server to the client.
///
/// Every part is optional on the wire. `data` is always text: structured data received from a
/// peer is kept as its JSON serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl RemoteError {
    pub fn new(code: Option<i64>, message: Option<String>, data: Option<String>) -> Self {
        Self {
            code,
            message,
            data,
        }
    }

    /// An error that carries only a message, as produced by peers that send `"error": "..."`.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::new(None, Some(message.into()), None)
    }

    pub fn with_code(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self::new(Some(code.code()), Some(message.into()), None)
    }

    pub fn parse_error(data: Option<String>) -> Self {
        Self::new(
            Some(JsonRpcErrorCode::ParseError.code()),
            Some("unable to parse json-rpc request".to_string()),
            data,
        )
    }

    pub fn invalid_request(message: impl Into<String>, data: Option<String>) -> Self {
        Self::new(
            Some(JsonRpcErrorCode::InvalidRequest.code()),
            Some(message.into()),
            data,
        )
    }

    pub fn method_not_found() -> Self {
        Self::with_code(JsonRpcErrorCode::MethodNotFound, "no such method exists")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::with_code(JsonRpcErrorCode::InvalidParams, message)
    }

    pub fn server_error(n: u8, message: Option<String>, data: Option<String>) -> Self {
        Self::new(Some(JsonRpcErrorCode::ServerError(n).code()), message, data)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jsonrpc error")?;
        if let Some(code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message.as_deref().unwrap_or_default())?;
        if let Some(data) = &self.data {
            write!(f, "\ncaused by: {data}")?;
        }
        Ok(())
    }
}

impl StdError for RemoteError {}

/// Transport-level errors (no protocol semantics)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport closed")]
    Closed,

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// The error type of every capability interface method.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The peer answered with an error envelope
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The request never got an answer
    #[error("unable to get data from transport: {0}")]
    Transport(#[from] TransportError),

    #[error("unable to decode {context}: {message}")]
    Decode { context: String, message: String },

    #[error("unable to encode {context}: {message}")]
    Encode { context: String, message: String },

    /// A handler failed with a domain error
    #[error("{0}")]
    Handler(Box<dyn StdError + Send + Sync>),

    #[error("handler panicked: {0}")]
    Panic(String),

    #[error("interface '{interface}' is not bound to this stub")]
    NotBound { interface: String },
}

impl RpcError {
    /// Wrap any error (or message) raised by handler code.
    pub fn handler(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Handler(error.into())
    }

    pub fn decode(context: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            message: error.to_string(),
        }
    }

    pub fn encode(context: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::Encode {
            context: context.into(),
            message: error.to_string(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The remote error, if the server answered with one
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(remote) => Some(remote),
            _ => None,
        }
    }

    /// Convert into the error that goes on the wire. Structured remote errors pass through;
    /// everything else becomes server error `-32000` with the cause chain as data.
    pub fn into_remote(self, include_diagnostics: bool) -> RemoteError {
        match self {
            Self::Remote(remote) => remote,
            other => {
                let data = include_diagnostics.then(|| diagnostic_trace(&other));
                RemoteError::server_error(0, Some(other.to_string()), data)
            }
        }
    }
}

/// Errors raised while registering handlers or binding stubs.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("executor has been locked, can't add more handlers")]
    Locked,

    #[error("handler '{0}' already exists")]
    DuplicateHandler(String),

    #[error("at least one interface has to be mentioned")]
    NoInterfaces,

    #[error("invalid handler name '{0}'")]
    InvalidHandlerName(String),

    #[error("invalid interface {interface}: {source}")]
    InvalidInterface {
        interface: String,
        #[source]
        source: TypeError,
    },
}

/// Strict-mode type validation failure, naming the offending type, field, method or parameter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("no zero-arg construction path: {type_name}")]
    NotConstructible { type_name: String },

    #[error("abstract type or interface not allowed: {type_name}")]
    Abstract { type_name: String },

    #[error("anonymous type not allowed: {type_name}")]
    Anonymous { type_name: String },

    #[error("parametrized type not allowed: {type_name}")]
    Generic { type_name: String },

    #[error("read-only field found: {type_name}.{field}")]
    ReadonlyField { type_name: String, field: String },

    #[error("invalid field found: {type_name}.{field}")]
    InvalidField {
        type_name: String,
        field: String,
        #[source]
        source: Box<TypeError>,
    },

    #[error("invalid return type of method {method}")]
    InvalidReturn {
        method: String,
        #[source]
        source: Box<TypeError>,
    },

    #[error("invalid parameter {index} of method {method}")]
    InvalidParam {
        method: String,
        index: usize,
        #[source]
        source: Box<TypeError>,
    },
}

impl TypeError {
    /// The innermost failure, i.e. the type that actually broke the rules.
    pub fn root_cause(&self) -> &TypeError {
        match self {
            TypeError::InvalidField { source, .. }
            | TypeError::InvalidReturn { source, .. }
            | TypeError::InvalidParam { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Render an error with its whole `source` chain, plus a backtrace when one was captured.
pub fn diagnostic_trace(error: &(dyn StdError + 'static)) -> String {
    let mut trace = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str("\ncaused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        trace.push_str("\n\n");
        trace.push_str(&backtrace.to_string());
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
        assert_eq!(JsonRpcErrorCode::ServerError(0).code(), -32000);
        assert_eq!(JsonRpcErrorCode::ServerError(1).code(), -32001);
        assert_eq!(error_codes::UNHANDLED_HANDLER_ERROR, -32000);
        assert_eq!(error_codes::EXECUTOR_ERROR, -32001);
    }

    #[test]
    fn test_constructors_carry_their_codes() {
        assert_eq!(RemoteError::parse_error(None).code, Some(-32700));
        assert_eq!(RemoteError::invalid_request("x", None).code, Some(-32600));
        assert_eq!(RemoteError::method_not_found().code, Some(-32601));
        assert_eq!(RemoteError::invalid_params("x").code, Some(-32602));
        assert_eq!(RemoteError::server_error(1, None, None).code, Some(-32001));
        assert_eq!(
            RemoteError::with_code(JsonRpcErrorCode::InternalError, "x").code,
            Some(-32603)
        );
    }

    #[test]
    fn test_error_serialization_omits_missing_parts() {
        let error = RemoteError::method_not_found();
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"code":-32601,"message":"no such method exists"}"#);

        let json = serde_json::to_string(&RemoteError::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_remote_error_display() {
        let error = RemoteError::new(Some(-32002), Some("x".to_string()), Some("y".to_string()));
        assert_eq!(error.to_string(), "jsonrpc error[-32002]: x\ncaused by: y");
        assert_eq!(
            RemoteError::message_only("boom").to_string(),
            "jsonrpc error: boom"
        );
    }

    #[test]
    fn test_handler_error_wraps_into_server_error() {
        let io = std::io::Error::other("disk on fire");
        let remote = RpcError::handler(io).into_remote(true);
        assert_eq!(remote.code, Some(-32000));
        assert_eq!(remote.message.as_deref(), Some("disk on fire"));
        assert!(remote.data.unwrap().starts_with("disk on fire"));

        let remote = RpcError::handler("quiet").into_remote(false);
        assert_eq!(remote.data, None);
    }

    #[test]
    fn test_remote_error_passes_through() {
        let original = RemoteError::invalid_params("bad");
        let remote = RpcError::from(original.clone()).into_remote(true);
        assert_eq!(remote, original);
    }

    #[test]
    fn test_diagnostic_trace_includes_causes() {
        let error = TypeError::InvalidField {
            type_name: "Outer".to_string(),
            field: "inner".to_string(),
            source: Box::new(TypeError::Abstract {
                type_name: "Inner".to_string(),
            }),
        };
        let trace = diagnostic_trace(&error);
        assert!(trace.starts_with("invalid field found: Outer.inner"));
        assert!(trace.contains("caused by: abstract type or interface not allowed: Inner"));
        assert_eq!(
            error.root_cause(),
            &TypeError::Abstract {
                type_name: "Inner".to_string()
            }
        );
    }
}
