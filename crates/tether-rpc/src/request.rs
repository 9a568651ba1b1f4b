use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::RemoteError;
use crate::types::RequestId;

static METHOD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([_a-zA-Z][_a-zA-Z0-9]*)\.([_a-zA-Z][_a-zA-Z0-9]*)$")
        .expect("method pattern is a valid regex")
});

static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[_a-zA-Z][_a-zA-Z0-9]*$").expect("identifier pattern is a valid regex")
});

/// Split `"<handler>.<method>"` into its two identifiers.
pub fn split_method(method: &str) -> Option<(&str, &str)> {
    let captures = METHOD_PATTERN.captures(method)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

/// Whether `name` is a valid handler or method identifier.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(name)
}

/// A request envelope as sent by the invoker: `{"id", "method", "params"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: String, params: Vec<Value>) -> Self {
        Self { id, method, params }
    }
}

/// A request as the executor sees it once the envelope passed the shape check.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingRequest {
    /// Echoed verbatim on the response
    pub id: Value,
    pub handler: String,
    pub method: String,
    pub params: Vec<Value>,
}

impl IncomingRequest {
    /// Shape-check a decoded envelope. Every failure maps to `INVALID_REQUEST`.
    pub fn from_object(mut object: Map<String, Value>) -> Result<Self, RemoteError> {
        let id = object.remove("id").unwrap_or(Value::Null);

        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            Some(other) => {
                return Err(RemoteError::invalid_request(
                    "unable to read request",
                    Some(format!("method must be a string, found {other}")),
                ));
            }
            None => {
                return Err(RemoteError::invalid_request(
                    "unable to read request",
                    Some("missing method".to_string()),
                ));
            }
        };

        let params = match object.remove("params") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(params)) => params,
            Some(other) => {
                return Err(RemoteError::invalid_request(
                    "unable to read request",
                    Some(format!("params must be an array, found {other}")),
                ));
            }
        };

        let (handler, method) = split_method(&method)
            .map(|(handler, name)| (handler.to_string(), name.to_string()))
            .ok_or_else(|| RemoteError::invalid_request("invalid method name", Some(method.clone())))?;

        Ok(Self {
            id,
            handler,
            method,
            params,
        })
    }
}
