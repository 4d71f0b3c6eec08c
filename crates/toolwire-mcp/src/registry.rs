//! Per-server tool discovery with a process-lifetime cache.
//!
//! Each configured server moves through
//! `Unattempted → Loading → Loaded | Unavailable`. Both terminal states are
//! cached until [`McpRegistry::invalidate`] resets the server, so repeated
//! discovery never re-hits the network. Discovery is advisory: every failure
//! degrades the server to "no tools" instead of surfacing an error.

use crate::client::{McpClient, ToolDescriptor, probe_endpoint};
use crate::config::{ClientInfo, McpConfig, McpTimeouts};
use crate::error::McpError;
use crate::schema::ParameterSchema;
use crate::tool::McpTool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Tools keyed by name.
pub type ToolMap = HashMap<String, Arc<McpTool>>;

/// Observable discovery state of one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Unattempted,
    Loading,
    /// Discovery registered this many tools.
    Loaded(usize),
    /// Discovery ran and registered nothing.
    Unavailable,
}

enum Slot {
    Unattempted,
    Loading,
    Loaded(ToolMap),
    Unavailable,
}

struct ServerEntry {
    client: Arc<McpClient>,
    // Concurrent discoveries may race; the last writer wins.
    slot: Mutex<Slot>,
}

impl ServerEntry {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Registry of all configured MCP servers and their discovered tools.
pub struct McpRegistry {
    servers: Vec<ServerEntry>,
    http: reqwest::Client,
    timeouts: McpTimeouts,
    client_info: ClientInfo,
}

impl McpRegistry {
    /// Build a registry for every configured server. No network traffic happens here.
    pub fn new(config: &McpConfig) -> Result<Self, McpError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| McpError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let servers = config
            .servers
            .iter()
            .map(|server| {
                let client = McpClient::new(
                    server.clone(),
                    http.clone(),
                    config.timeouts,
                    config.client.clone(),
                )?;
                Ok(ServerEntry {
                    client: Arc::new(client),
                    slot: Mutex::new(Slot::Unattempted),
                })
            })
            .collect::<Result<Vec<_>, McpError>>()?;

        Ok(Self {
            servers,
            http,
            timeouts: config.timeouts,
            client_info: config.client.clone(),
        })
    }

    /// Configured server names, in configuration order.
    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.client.server_name()).collect()
    }

    /// The client of a configured server.
    pub fn client(&self, server: &str) -> Option<&Arc<McpClient>> {
        self.entry(server).map(|e| &e.client)
    }

    /// Current discovery state of a configured server.
    pub fn state(&self, server: &str) -> Option<DiscoveryState> {
        self.entry(server).map(|entry| match &*entry.slot() {
            Slot::Unattempted => DiscoveryState::Unattempted,
            Slot::Loading => DiscoveryState::Loading,
            Slot::Loaded(tools) => DiscoveryState::Loaded(tools.len()),
            Slot::Unavailable => DiscoveryState::Unavailable,
        })
    }

    /// Tools of one server, discovering them on first use.
    ///
    /// Only an unknown server name is an error.
    pub async fn tools_for(
        &self,
        server: &str,
        cancel: &CancellationToken,
    ) -> Result<ToolMap, McpError> {
        let entry = self.entry(server).ok_or_else(|| McpError::UnknownServer {
            name: server.to_string(),
        })?;
        Ok(discover(entry, cancel).await)
    }

    /// Tools of every server, in configuration order. Later servers win name
    /// collisions. Never fails; servers without tools contribute nothing.
    pub async fn all_tools(&self, cancel: &CancellationToken) -> ToolMap {
        let mut all = ToolMap::new();
        for entry in &self.servers {
            all.extend(discover(entry, cancel).await);
        }
        if !all.is_empty() {
            tracing::info!(
                "MCP: {} tool(s) from {} server(s)",
                all.len(),
                self.servers.len()
            );
        }
        all
    }

    /// Clear cached tools and session of one server, or of all when `None`.
    pub fn invalidate(&self, server: Option<&str>) {
        for entry in &self.servers {
            if server.is_none_or(|name| name == entry.client.server_name()) {
                *entry.slot() = Slot::Unattempted;
                entry.client.session().invalidate();
            }
        }
    }

    /// Liveness probe: a lightweight `tools/list` with the probe timeout.
    pub async fn is_available(&self, server: &str) -> bool {
        let Some(entry) = self.entry(server) else {
            return false;
        };
        let result = entry
            .client
            .call(
                "tools/list",
                serde_json::json!({}),
                self.timeouts.probe(),
                &CancellationToken::new(),
            )
            .await;
        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("MCP server '{server}' is not available: {e}");
                false
            }
        }
    }

    /// Check an arbitrary endpoint without registering it.
    pub async fn probe(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolDescriptor>, McpError> {
        probe_endpoint(
            url,
            self.http.clone(),
            self.timeouts,
            self.client_info.clone(),
            cancel,
        )
        .await
    }

    fn entry(&self, server: &str) -> Option<&ServerEntry> {
        self.servers.iter().find(|s| s.client.server_name() == server)
    }
}

async fn discover(entry: &ServerEntry, cancel: &CancellationToken) -> ToolMap {
    {
        let mut slot = entry.slot();
        match &*slot {
            Slot::Loaded(tools) => return tools.clone(),
            Slot::Unavailable => return ToolMap::new(),
            Slot::Unattempted | Slot::Loading => *slot = Slot::Loading,
        }
    }

    let server = entry.client.server_name();
    match load_tools(&entry.client, cancel).await {
        Ok(tools) if !tools.is_empty() => {
            tracing::info!("MCP [{server}]: {} tool(s) loaded", tools.len());
            *entry.slot() = Slot::Loaded(tools.clone());
            tools
        }
        Ok(_) => {
            tracing::info!("MCP [{server}]: no usable tools");
            *entry.slot() = Slot::Unavailable;
            ToolMap::new()
        }
        Err(McpError::Cancelled) => {
            tracing::debug!("MCP [{server}]: discovery cancelled");
            *entry.slot() = Slot::Unattempted;
            ToolMap::new()
        }
        Err(e) => {
            tracing::warn!("MCP [{server}] unavailable: {e}");
            *entry.slot() = Slot::Unavailable;
            ToolMap::new()
        }
    }
}

async fn load_tools(
    client: &Arc<McpClient>,
    cancel: &CancellationToken,
) -> Result<ToolMap, McpError> {
    // Some servers need initialize before tools/list even without a session.
    client.session().ensure(cancel).await?;

    let descriptors = client.list_tools(client.timeouts().list(), cancel).await?;

    let mut tools = ToolMap::new();
    for descriptor in descriptors {
        match ParameterSchema::translate(&descriptor.input_schema) {
            Ok(parameters) => {
                let name = descriptor.name.clone();
                let tool = McpTool::new(descriptor, parameters, Arc::clone(client));
                tools.insert(name, Arc::new(tool));
            }
            Err(e) => tracing::warn!(
                "Skipping tool '{}' from '{}': {e}",
                descriptor.name,
                client.server_name()
            ),
        }
    }
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::McpServerConfig;

    async fn dead_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/mcp")
    }

    fn config_with(servers: Vec<McpServerConfig>) -> McpConfig {
        McpConfig {
            servers,
            ..McpConfig::default()
        }
    }

    #[tokio::test]
    async fn empty_config_has_no_tools() {
        let registry = McpRegistry::new(&McpConfig::default()).unwrap();
        assert!(registry.server_names().is_empty());
        assert!(registry.all_tools(&CancellationToken::new()).await.is_empty());
    }

    #[test]
    fn server_names_keep_configuration_order() {
        let registry = McpRegistry::new(&config_with(vec![
            McpServerConfig::http("zeta", "http://localhost:1/mcp"),
            McpServerConfig::http("alpha", "http://localhost:2/mcp"),
        ]))
        .unwrap();
        assert_eq!(registry.server_names(), vec!["zeta", "alpha"]);
        assert_eq!(registry.state("zeta"), Some(DiscoveryState::Unattempted));
        assert_eq!(registry.state("missing"), None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = McpRegistry::new(&config_with(vec![McpServerConfig::http("x", "nope")]));
        assert!(matches!(result, Err(McpError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn unknown_server_is_an_error() {
        let registry = McpRegistry::new(&McpConfig::default()).unwrap();
        let result = registry.tools_for("ghost", &CancellationToken::new()).await;
        assert!(matches!(result, Err(McpError::UnknownServer { .. })));
        assert!(!registry.is_available("ghost").await);
    }

    #[tokio::test]
    async fn unreachable_server_degrades_to_unavailable() {
        let registry =
            McpRegistry::new(&config_with(vec![McpServerConfig::http("down", dead_url().await)]))
                .unwrap();
        let cancel = CancellationToken::new();

        assert!(registry.all_tools(&cancel).await.is_empty());
        assert_eq!(registry.state("down"), Some(DiscoveryState::Unavailable));
        // The fallback session token is kept.
        let token = registry.client("down").unwrap().session().current().unwrap();
        assert!(token.starts_with("temp-"));

        // Cached: still unavailable, still empty.
        assert!(registry.tools_for("down", &cancel).await.unwrap().is_empty());

        registry.invalidate(Some("down"));
        assert_eq!(registry.state("down"), Some(DiscoveryState::Unattempted));
        assert!(registry.client("down").unwrap().session().current().is_none());
    }

    #[tokio::test]
    async fn cancelled_discovery_is_not_cached() {
        let registry =
            McpRegistry::new(&config_with(vec![McpServerConfig::http("svc", dead_url().await)]))
                .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(registry.all_tools(&cancel).await.is_empty());
        assert_eq!(registry.state("svc"), Some(DiscoveryState::Unattempted));
    }

    #[test]
    fn invalidate_all_resets_every_session() {
        let registry = McpRegistry::new(&config_with(vec![
            McpServerConfig::http("a", "http://localhost:1/mcp"),
            McpServerConfig::http("b", "http://localhost:2/mcp"),
        ]))
        .unwrap();
        for name in ["a", "b"] {
            registry.client(name).unwrap().session().set("tok");
        }
        registry.invalidate(None);
        for name in ["a", "b"] {
            assert!(registry.client(name).unwrap().session().current().is_none());
        }
    }
}
