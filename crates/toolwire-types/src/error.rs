//! Error hierarchy for Toolwire consumers.

use thiserror::Error;

/// Errors surfaced to the runtime that invokes a tool.
///
/// These are tool-level failures: the calling runtime reports them back to the
/// language model as a failed tool call instead of aborting the conversation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Tool server error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Tool timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Tool call cancelled")]
    Cancelled,

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Whether the failure came from the caller's arguments rather than the server.
    pub fn is_invalid_arguments(&self) -> bool {
        matches!(self, ToolError::InvalidArguments { .. })
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
