//! JSON-RPC 2.0 envelopes for MCP communication.

use serde::{Deserialize, Serialize};

/// Error code servers use for a rejected or expired session.
pub const INVALID_REQUEST: i64 = -32600;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request. A `null` params value is sent as `{}`.
    pub fn new(id: u64, method: impl Into<String>, params: serde_json::Value) -> Self {
        let params = if params.is_null() {
            serde_json::json!({})
        } else {
            params
        };
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    /// Some servers echo the session token in the envelope.
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Whether the server rejected the request because of its session.
    pub fn is_session_error(&self) -> bool {
        self.code == INVALID_REQUEST && self.message.to_ascii_lowercase().contains("session")
    }
}
