//! Configuration types for MCP servers.

use crate::error::McpError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

fn default_true() -> bool {
    true
}

/// Top-level MCP configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    /// Servers in configuration order. Later servers win tool-name collisions.
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
    #[serde(default)]
    pub timeouts: McpTimeouts,
    #[serde(default)]
    pub client: ClientInfo,
}

/// Configuration for a single MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique key for this server.
    pub name: String,
    /// JSON-RPC endpoint URL.
    pub url: String,
    #[serde(default)]
    pub transport: TransportKind,
    /// Whether an `initialize` handshake must precede other requests.
    #[serde(default = "default_true")]
    pub requires_session: bool,
}

impl McpServerConfig {
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            transport: TransportKind::Http,
            requires_session: true,
        }
    }
}

/// Supported transports. Only HTTP(S) POST is implemented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Http,
}

/// Per-method request deadlines in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpTimeouts {
    pub initialize_ms: u64,
    pub list_ms: u64,
    pub call_ms: u64,
    pub probe_ms: u64,
}

impl Default for McpTimeouts {
    fn default() -> Self {
        Self {
            initialize_ms: 5000,
            list_ms: 3000,
            call_ms: 10_000,
            probe_ms: 2000,
        }
    }
}

impl McpTimeouts {
    pub fn initialize(&self) -> Duration {
        Duration::from_millis(self.initialize_ms)
    }

    pub fn list(&self) -> Duration {
        Duration::from_millis(self.list_ms)
    }

    pub fn call(&self) -> Duration {
        Duration::from_millis(self.call_ms)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }
}

/// Client identity announced in `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "toolwire".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl McpConfig {
    /// Reject empty or duplicate server names and unparseable URLs.
    pub fn validate(&self) -> Result<(), McpError> {
        let mut seen = HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err(McpError::InvalidConfig(
                    "server name must not be empty".to_string(),
                ));
            }
            if !seen.insert(server.name.as_str()) {
                return Err(McpError::InvalidConfig(format!(
                    "duplicate server name '{}'",
                    server.name
                )));
            }
            reqwest::Url::parse(&server.url).map_err(|e| {
                McpError::InvalidConfig(format!(
                    "server '{}' has invalid url '{}': {e}",
                    server.name, server.url
                ))
            })?;
        }
        Ok(())
    }

    /// Look up a server by name.
    pub fn server(&self, name: &str) -> Option<&McpServerConfig> {
        self.servers.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_server() {
        let toml_str = r#"
[[servers]]
name = "authorizations"
url = "https://tools.example.com/authorizations/mcp"
"#;
        let config: McpConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.servers.len(), 1);
        let auth = &config.servers[0];
        assert_eq!(auth.name, "authorizations");
        assert_eq!(auth.transport, TransportKind::Http);
        assert!(auth.requires_session); // default
        assert_eq!(config.timeouts, McpTimeouts::default());
    }

    #[test]
    fn parse_multiple_servers_keeps_order() {
        let toml_str = r#"
[[servers]]
name = "zeta"
url = "http://localhost:9000/mcp"

[[servers]]
name = "alpha"
url = "http://localhost:9001/mcp"
requires_session = false
"#;
        let config: McpConfig = toml::from_str(toml_str).unwrap();
        let names: Vec<&str> = config.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(!config.servers[1].requires_session);
    }

    #[test]
    fn parse_timeouts_and_client() {
        let toml_str = r#"
[timeouts]
call_ms = 30000

[client]
name = "assistant"
version = "2.0.0"
"#;
        let config: McpConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timeouts.call_ms, 30_000);
        assert_eq!(config.timeouts.initialize_ms, 5000);
        assert_eq!(config.timeouts.list(), Duration::from_secs(3));
        assert_eq!(config.client.name, "assistant");
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let toml_str = r#"
[[servers]]
name = "ws"
url = "ws://localhost/mcp"
transport = "websocket"
"#;
        assert!(toml::from_str::<McpConfig>(toml_str).is_err());
    }

    #[test]
    fn validate_rejects_duplicates() {
        let config = McpConfig {
            servers: vec![
                McpServerConfig::http("a", "http://localhost/1"),
                McpServerConfig::http("a", "http://localhost/2"),
            ],
            ..McpConfig::default()
        };
        match config.validate() {
            Err(McpError::InvalidConfig(msg)) => assert!(msg.contains("duplicate")),
            other => panic!("Expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_url() {
        let config = McpConfig {
            servers: vec![McpServerConfig::http("a", "not a url")],
            ..McpConfig::default()
        };
        assert!(matches!(config.validate(), Err(McpError::InvalidConfig(_))));
    }

    #[test]
    fn default_config_is_empty_and_valid() {
        let config = McpConfig::default();
        assert!(config.servers.is_empty());
        assert!(config.validate().is_ok());
        assert_eq!(config.client.name, "toolwire");
    }
}
