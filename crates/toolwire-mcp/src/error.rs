//! Error types for MCP operations.

use thiserror::Error;
use toolwire_types::ToolError;

/// Errors from MCP server communication.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Malformed response from MCP server: {0}")]
    MalformedResponse(String),

    #[error("MCP server '{server}' timed out on {method} after {timeout_ms}ms")]
    Timeout {
        server: String,
        method: String,
        timeout_ms: u64,
    },

    /// Protocol-level failure. HTTP non-2xx statuses are folded in with the
    /// status as `code`.
    #[error("RPC error from '{server}' (code {code}): {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },

    #[error("Failed to reach MCP server '{server}': {message}")]
    Network { server: String, message: String },

    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Cannot translate schema property '{property}': {message}")]
    SchemaTranslation { property: String, message: String },

    #[error("MCP request cancelled")]
    Cancelled,

    #[error("Unknown MCP server '{name}'")]
    UnknownServer { name: String },

    #[error("Invalid MCP configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<McpError> for ToolError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::InvalidArguments { tool, message } => {
                ToolError::InvalidArguments { tool, message }
            }
            McpError::Rpc { code, message, .. } => ToolError::Rpc { code, message },
            McpError::Timeout { timeout_ms, .. } => ToolError::Timeout { timeout_ms },
            McpError::Cancelled => ToolError::Cancelled,
            other => ToolError::ExecutionFailed(other.to_string()),
        }
    }
}

/// Shorten a response body for inclusion in an error message.
pub(crate) fn excerpt(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_maps_to_tool_rpc() {
        let err = McpError::Rpc {
            server: "auth".into(),
            code: -32601,
            message: "Method not found".into(),
        };
        match ToolError::from(err) {
            ToolError::Rpc { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("Expected Rpc, got {other:?}"),
        }
    }

    #[test]
    fn timeout_and_invalid_arguments_keep_their_kind() {
        let timeout = McpError::Timeout {
            server: "auth".into(),
            method: "tools/call".into(),
            timeout_ms: 10_000,
        };
        assert!(matches!(
            ToolError::from(timeout),
            ToolError::Timeout { timeout_ms: 10_000 }
        ));

        let invalid = McpError::InvalidArguments {
            tool: "search".into(),
            message: "bad".into(),
        };
        assert!(ToolError::from(invalid).is_invalid_arguments());
    }

    #[test]
    fn network_becomes_execution_failed() {
        let err = McpError::Network {
            server: "auth".into(),
            message: "connection refused".into(),
        };
        match ToolError::from(err) {
            ToolError::ExecutionFailed(msg) => assert!(msg.contains("connection refused")),
            other => panic!("Expected ExecutionFailed, got {other:?}"),
        }
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let body = "\u{00e9}".repeat(300); // 600 bytes
        let short = excerpt(&body);
        assert!(short.ends_with("..."));
        assert!(short.len() <= 503);

        assert_eq!(excerpt("short"), "short");
    }
}
