use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RemoteError, RpcError, RpcResult};
use crate::types::JsonRpcVersion;

/// A successful JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    /// Echo of the request id, `null` when it was unknown
    pub id: Value,
    /// `null` for void methods
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn new(id: Value, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            result,
        }
    }
}

/// A JSON-RPC error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: Value,
    pub error: RemoteError,
}

impl JsonRpcErrorResponse {
    pub fn new(id: Value, error: RemoteError) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            error,
        }
    }
}

/// Union type that represents either a successful response or an error response.
/// `result` and `error` never appear on the same envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcErrorResponse),
}

impl JsonRpcMessage {
    /// Create a success message
    pub fn success(id: Value, result: Value) -> Self {
        Self::Response(JsonRpcResponse::new(id, result))
    }

    /// Create an error message
    pub fn error(id: Value, error: RemoteError) -> Self {
        Self::Error(JsonRpcErrorResponse::new(id, error))
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the request ID from either response or error
    pub fn id(&self) -> &Value {
        match self {
            JsonRpcMessage::Response(resp) => &resp.id,
            JsonRpcMessage::Error(err) => &err.id,
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Read a response envelope on the client side.
///
/// Returns the raw `result` (`null` when absent) or the remote error the envelope carries.
pub fn parse_response(text: &str) -> RpcResult<Value> {
    let envelope: Value =
        serde_json::from_str(text).map_err(|e| RpcError::decode("response", e))?;
    let mut envelope = match envelope {
        Value::Object(envelope) => envelope,
        other => {
            return Err(RpcError::decode(
                "response",
                format!("expected a JSON object, found {other}"),
            ));
        }
    };

    match envelope.remove("error") {
        None | Some(Value::Null) => {}
        Some(error) => return Err(RpcError::Remote(remote_error_from_value(error))),
    }

    Ok(envelope.remove("result").unwrap_or(Value::Null))
}

/// Interpret the `error` member of a response envelope.
pub fn remote_error_from_value(error: Value) -> RemoteError {
    match error {
        Value::Object(fields) => {
            let code = fields.get("code").and_then(Value::as_i64);
            let message = fields.get("message").and_then(text_of);
            let data = fields.get("data").and_then(text_of);
            RemoteError::new(code, message, data)
        }
        other @ Value::Array(_) => {
            RemoteError::message_only(format!("unknown error, data = {other}"))
        }
        scalar => RemoteError::new(None, text_of(&scalar), None),
    }
}

// Strings keep their content, structured values their JSON text, null means absent.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
