//! MCP client: JSON-RPC calls against one server.
//!
//! Every call goes through [`McpClient::call`], which makes sure a session
//! exists, classifies the reply, and on a session rejection runs exactly one
//! invalidate → re-initialize → retry cycle.

use crate::config::{ClientInfo, McpServerConfig, McpTimeouts};
use crate::error::{McpError, excerpt};
use crate::frame;
use crate::jsonrpc::JsonRpcResponse;
use crate::session::SessionManager;
use crate::transport::{HttpReply, HttpTransport};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default = "default_schema", rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Outcome of a single HTTP attempt.
enum Attempt {
    Complete(serde_json::Value),
    /// The server rejected our session; the error is what the caller sees if
    /// the retry is rejected too.
    SessionRejected(McpError),
}

/// Client for a single MCP server.
pub struct McpClient {
    config: McpServerConfig,
    transport: HttpTransport,
    session: SessionManager,
    timeouts: McpTimeouts,
}

impl McpClient {
    /// Build a client for `config`. No network traffic happens until the first call.
    pub fn new(
        config: McpServerConfig,
        http: reqwest::Client,
        timeouts: McpTimeouts,
        client_info: ClientInfo,
    ) -> Result<Self, McpError> {
        let transport = HttpTransport::new(config.name.clone(), http, &config.url)?;
        let session = SessionManager::new(transport.clone(), client_info, timeouts.initialize());
        Ok(Self {
            config,
            transport,
            session,
            timeouts,
        })
    }

    /// Get the server name.
    pub fn server_name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    pub fn timeouts(&self) -> &McpTimeouts {
        &self.timeouts
    }

    /// The session state of this server.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Perform a JSON-RPC call and return its `result`.
    ///
    /// A 401/403 status, or a `-32600` error mentioning the session, triggers
    /// one re-initialization and one retry. A second rejection is returned as is.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, McpError> {
        if self.config.requires_session && self.session.current().is_none() {
            self.session.ensure(cancel).await?;
        }

        let rejection = match self.attempt(method, &params, timeout, cancel).await? {
            Attempt::Complete(result) => return Ok(result),
            Attempt::SessionRejected(err) => err,
        };

        tracing::info!(
            "MCP server '{}' rejected session on {method} ({rejection}); re-initializing",
            self.config.name
        );
        self.session.invalidate();
        self.session.ensure(cancel).await?;

        match self.attempt(method, &params, timeout, cancel).await? {
            Attempt::Complete(result) => Ok(result),
            Attempt::SessionRejected(err) => Err(err),
        }
    }

    /// Discover the tools this server exposes.
    ///
    /// Entries that cannot be decoded are skipped; a result without a `tools`
    /// array is a [`McpError::MalformedResponse`].
    pub async fn list_tools(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolDescriptor>, McpError> {
        let result = self
            .call("tools/list", serde_json::json!({}), timeout, cancel)
            .await?;
        parse_tools_list(&self.config.name, result)
    }

    /// Invoke a tool and return the raw `tools/call` result.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, McpError> {
        let arguments = if arguments.is_null() {
            serde_json::json!({})
        } else {
            arguments
        };
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });
        self.call("tools/call", params, self.timeouts.call(), cancel).await
    }

    async fn attempt(
        &self,
        method: &str,
        params: &serde_json::Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Attempt, McpError> {
        let token = self.session.current();
        let reply = self
            .transport
            .post(method, params.clone(), token.as_deref(), timeout, cancel)
            .await?;

        // A refreshed token is honoured on every path, including errors.
        if let Some(refreshed) = &reply.session_id {
            self.session.set(refreshed.clone());
        }

        self.classify(method, reply)
    }

    fn classify(&self, method: &str, reply: HttpReply) -> Result<Attempt, McpError> {
        if !reply.is_success() {
            tracing::warn!(
                "MCP server '{}' answered {method} with HTTP {}",
                self.config.name,
                reply.status
            );
            let err = McpError::Rpc {
                server: self.config.name.clone(),
                code: i64::from(reply.status),
                message: format!("HTTP {}: {}", reply.status, excerpt(&reply.body)),
            };
            return match reply.status {
                401 | 403 => Ok(Attempt::SessionRejected(err)),
                _ => Err(err),
            };
        }

        let value = frame::decode_body(&reply.body)?;
        let response: JsonRpcResponse = serde_json::from_value(value).map_err(|e| {
            McpError::MalformedResponse(format!("not a JSON-RPC response to {method}: {e}"))
        })?;

        if let Some(err) = response.error {
            let session_error = err.is_session_error();
            let err = McpError::Rpc {
                server: self.config.name.clone(),
                code: err.code,
                message: err.message,
            };
            return if session_error {
                Ok(Attempt::SessionRejected(err))
            } else {
                Err(err)
            };
        }

        if let Some(sid) = response.session_id {
            self.session.seed(sid);
        }

        Ok(Attempt::Complete(
            response.result.unwrap_or(serde_json::Value::Null),
        ))
    }
}

#[derive(Deserialize)]
struct ToolsListResult {
    tools: Vec<serde_json::Value>,
}

fn parse_tools_list(
    server: &str,
    result: serde_json::Value,
) -> Result<Vec<ToolDescriptor>, McpError> {
    let list: ToolsListResult = serde_json::from_value(result).map_err(|e| {
        McpError::MalformedResponse(format!("tools/list result from '{server}': {e}"))
    })?;

    let mut tools = Vec::with_capacity(list.tools.len());
    for entry in list.tools {
        match serde_json::from_value::<ToolDescriptor>(entry) {
            Ok(tool) => tools.push(tool),
            Err(e) => tracing::warn!("Skipping undecodable tool from '{server}': {e}"),
        }
    }
    Ok(tools)
}

/// One-off check of an arbitrary endpoint: `initialize`, then `tools/list`.
///
/// Touches no registry state and, unlike discovery, reports failures.
pub async fn probe_endpoint(
    url: &str,
    http: reqwest::Client,
    timeouts: McpTimeouts,
    client_info: ClientInfo,
    cancel: &CancellationToken,
) -> Result<Vec<ToolDescriptor>, McpError> {
    let client = McpClient::new(McpServerConfig::http("probe", url), http, timeouts, client_info)?;
    client.session.initialize(cancel).await?;
    client.list_tools(timeouts.list(), cancel).await
}
