//! HTTP transport for MCP server communication.
//!
//! Each request is a single JSON-RPC POST. The whole exchange (connect, send,
//! read body) runs under one deadline and one cancellation token; dropping the
//! in-flight future on either path closes the connection.

use crate::error::McpError;
use crate::jsonrpc::JsonRpcRequest;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Header carrying the session token, in both directions.
pub(crate) const SESSION_HEADER: &str = "mcp-session-id";

/// Secondary session header some servers look for.
const SESSION_HEADER_ALT: &str = "X-Session-ID";

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Raw outcome of one HTTP exchange, before JSON-RPC decoding.
#[derive(Debug)]
pub(crate) struct HttpReply {
    pub status: u16,
    /// Session token announced in the response headers, if any.
    pub session_id: Option<String>,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// POST-based transport bound to one server endpoint.
///
/// Clones share the request id counter.
#[derive(Clone)]
pub(crate) struct HttpTransport {
    server: String,
    http: reqwest::Client,
    endpoint: reqwest::Url,
    next_id: Arc<AtomicU64>,
}

impl HttpTransport {
    pub fn new(
        server: impl Into<String>,
        http: reqwest::Client,
        url: &str,
    ) -> Result<Self, McpError> {
        let server = server.into();
        let endpoint = reqwest::Url::parse(url).map_err(|e| {
            McpError::InvalidConfig(format!("server '{server}' has invalid url '{url}': {e}"))
        })?;
        Ok(Self {
            server,
            http,
            endpoint,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Wrap `params` in a fresh JSON-RPC envelope, send it, and read the full
    /// response body.
    pub async fn post(
        &self,
        method: &str,
        params: serde_json::Value,
        session_id: Option<&str>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<HttpReply, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        tracing::debug!(
            server = %self.server,
            method = %request.method,
            id = request.id,
            has_session = session_id.is_some(),
            "POST {}",
            self.endpoint
        );

        let exchange = async {
            let mut builder = self
                .http
                .post(self.endpoint.clone())
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, ACCEPT_BOTH)
                .json(&request);
            if let Some(sid) = session_id {
                builder = builder
                    .header(SESSION_HEADER, sid)
                    .header(SESSION_HEADER_ALT, sid);
            }

            let response = builder.send().await.map_err(|e| self.network_error(e))?;
            let status = response.status().as_u16();
            let session_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let body = response.text().await.map_err(|e| self.network_error(e))?;

            Ok(HttpReply {
                status,
                session_id,
                body,
            })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(McpError::Cancelled),
            outcome = tokio::time::timeout(timeout, exchange) => match outcome {
                Ok(reply) => reply,
                Err(_) => Err(McpError::Timeout {
                    server: self.server.clone(),
                    method: request.method.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            },
        }
    }

    fn network_error(&self, e: reqwest::Error) -> McpError {
        McpError::Network {
            server: self.server.clone(),
            message: e.to_string(),
        }
    }
}
