//! Response body decoding.
//!
//! MCP servers answer either with a bare JSON document or with an event-stream
//! body whose `data: ` lines carry the JSON-RPC message. Only the first
//! well-formed payload matters.

use crate::error::{McpError, excerpt};

/// Prefix of an event-stream data line.
pub const DATA_PREFIX: &str = "data: ";

/// Extract the JSON value enclosed in a response body.
///
/// Data lines are tried in order and the first one that parses wins. When no
/// data line parses, the whole body is parsed as plain JSON.
pub fn decode_body(body: &str) -> Result<serde_json::Value, McpError> {
    for line in body.lines() {
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        match serde_json::from_str(payload) {
            Ok(value) => return Ok(value),
            Err(e) => tracing::debug!("Skipping unparsable event-stream data line: {e}"),
        }
    }

    serde_json::from_str(body).map_err(|e| {
        McpError::MalformedResponse(format!("{e}; body: {}", excerpt(body.trim())))
    })
}
