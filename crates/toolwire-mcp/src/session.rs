//! Session lifecycle for one MCP server.
//!
//! A session token is opaque protocol bookkeeping. It is established lazily
//! with an `initialize` handshake and cleared on invalidation. Establishing a
//! session is best effort: when the handshake fails, a temporary local token is
//! used so that discovery can still proceed.

use crate::config::ClientInfo;
use crate::error::{McpError, excerpt};
use crate::frame;
use crate::transport::HttpTransport;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// MCP protocol version we announce.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Owns the possibly-absent session token of one server.
pub struct SessionManager {
    transport: HttpTransport,
    client_info: ClientInfo,
    timeout: Duration,
    token: Mutex<Option<String>>,
}

impl SessionManager {
    pub(crate) fn new(
        transport: HttpTransport,
        client_info: ClientInfo,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            client_info,
            timeout,
            token: Mutex::new(None),
        }
    }

    /// The cached token, if any.
    pub fn current(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Replace the cached token.
    pub fn set(&self, token: impl Into<String>) {
        *self.lock() = Some(token.into());
    }

    /// Store `token` only when no token is cached yet.
    pub fn seed(&self, token: impl Into<String>) {
        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(token.into());
        }
    }

    /// Clear the cached token unconditionally.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    /// Return the cached token, establishing a session first if needed.
    ///
    /// Never fails because of the server: any handshake failure degrades to a
    /// temporary local token. Only cancellation is propagated.
    pub async fn ensure(&self, cancel: &CancellationToken) -> Result<String, McpError> {
        if let Some(token) = self.current() {
            return Ok(token);
        }

        match self.initialize(cancel).await {
            Ok(token) => Ok(token),
            Err(McpError::Cancelled) => Err(McpError::Cancelled),
            Err(e) => {
                let token = temporary_token();
                tracing::warn!(
                    "Session initialization for '{}' failed ({e}); continuing with {token}",
                    self.transport.server()
                );
                self.set(token.clone());
                Ok(token)
            }
        }
    }

    /// Run the `initialize` handshake and cache the resulting token.
    ///
    /// Unlike [`ensure`](Self::ensure), failures are returned to the caller.
    pub async fn initialize(&self, cancel: &CancellationToken) -> Result<String, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "clientInfo": {
                "name": self.client_info.name,
                "version": self.client_info.version,
            }
        });

        let reply = self
            .transport
            .post("initialize", params, None, self.timeout, cancel)
            .await?;

        if !reply.is_success() {
            return Err(McpError::Rpc {
                server: self.transport.server().to_string(),
                code: i64::from(reply.status),
                message: format!(
                    "initialize failed: HTTP {}: {}",
                    reply.status,
                    excerpt(&reply.body)
                ),
            });
        }

        let body = frame::decode_body(&reply.body)?;
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            return Err(McpError::Rpc {
                server: self.transport.server().to_string(),
                code: err.get("code").and_then(|c| c.as_i64()).unwrap_or_default(),
                message: err
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string()),
            });
        }

        let token = resolve_token(reply.session_id.as_deref(), &body).unwrap_or_else(|| {
            tracing::debug!(
                "MCP server '{}' issued no session id; generating one",
                self.transport.server()
            );
            placeholder_token()
        });
        tracing::debug!("MCP server '{}' session established", self.transport.server());
        self.set(token.clone());
        Ok(token)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Pick the session token from an `initialize` reply.
///
/// Order: response header, `result.sessionId`, top-level `sessionId`.
pub fn resolve_token(header: Option<&str>, body: &serde_json::Value) -> Option<String> {
    if let Some(token) = header.filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }
    let from_body = |value: Option<&serde_json::Value>| {
        value
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    from_body(body.pointer("/result/sessionId")).or_else(|| from_body(body.get("sessionId")))
}

/// Locally generated token for a server that answered but issued none.
fn placeholder_token() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "session-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}

/// Token used when the handshake could not be completed at all.
fn temporary_token() -> String {
    format!("temp-{}", chrono::Utc::now().timestamp_millis())
}
