use serde::{Deserialize, Serialize};

/// Identifier of an outgoing request.
///
/// Responses echo whatever `id` the request carried, so the executor keeps it as a raw JSON value;
/// only the invoker builds these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl RequestId {
    /// A random non-negative 31-bit id. Collisions between concurrent calls are the transport's
    /// concern.
    pub fn random() -> Self {
        RequestId(i64::from(rand::random::<u32>() >> 1))
    }
}

/// JSON-RPC version tag written on every response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => crate::JSONRPC_VERSION,
        }
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let version = String::deserialize(deserializer)?;
        if version == crate::JSONRPC_VERSION {
            Ok(JsonRpcVersion::V2_0)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported JSON-RPC version: {version}"
            )))
        }
    }
}
