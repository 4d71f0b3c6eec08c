//! Layered TOML configuration for Toolwire.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toolwire_mcp::{ClientInfo, McpConfig, McpServerConfig, McpTimeouts};
use toolwire_types::ConfigError;

/// Name given to the server taken from `MCP_SERVER_URL`.
pub const DEFAULT_SERVER_NAME: &str = "default";

/// Environment variable naming a fallback MCP endpoint.
pub const SERVER_URL_ENV: &str = "MCP_SERVER_URL";

/// Resolved configuration for a Toolwire run.
#[derive(Debug, Clone)]
pub struct ToolwireConfig {
    pub mcp: McpConfig,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
    #[serde(default)]
    pub timeouts: McpTimeouts,
    #[serde(default)]
    pub client: ClientInfo,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit config file; unlike the default file it must parse.
    pub config_file: Option<PathBuf>,
    /// `--server NAME=URL` entries, in command-line order.
    pub servers: Vec<McpServerConfig>,
}

impl ToolwireConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Config file (~/.toolwire/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = match &overrides.config_file {
            Some(path) => read_settings_file(path)?,
            None => load_settings_file(&config_dir.join("config.toml")),
        };
        let env_url = std::env::var(SERVER_URL_ENV).ok();
        Self::resolve(settings, env_url, overrides, config_dir)
    }

    /// Merge already-read sources. Does not touch the environment or disk.
    pub fn resolve(
        settings: SettingsFile,
        env_url: Option<String>,
        overrides: CliOverrides,
        config_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let mut servers = settings.servers;

        // Env URL only fills an empty server list
        let env_url = env_url.filter(|u| servers.is_empty() && !u.trim().is_empty());
        if let Some(url) = env_url {
            servers.push(McpServerConfig::http(DEFAULT_SERVER_NAME, url.trim()));
        }

        // CLI servers replace same-named entries in place, else append
        for server in overrides.servers {
            match servers.iter_mut().find(|s| s.name == server.name) {
                Some(existing) => *existing = server,
                None => servers.push(server),
            }
        }

        let mcp = McpConfig {
            servers,
            timeouts: settings.timeouts,
            client: settings.client,
        };
        mcp.validate().map_err(|e| ConfigError::InvalidValue {
            key: "servers".into(),
            message: e.to_string(),
        })?;

        Ok(ToolwireConfig { mcp, config_dir })
    }
}

/// Parse a `NAME=URL` server override.
pub fn parse_server_override(entry: &str) -> Result<McpServerConfig, ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidValue {
        key: "--server".into(),
        message: format!("{message} (expected NAME=URL, got '{entry}')"),
    };
    let (name, url) = entry.split_once('=').ok_or_else(|| invalid("missing '='"))?;
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() {
        return Err(invalid("empty server name"));
    }
    if url.is_empty() {
        return Err(invalid("empty server url"));
    }
    Ok(McpServerConfig::http(name, url))
}

/// Get the Toolwire config directory path (~/.toolwire/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TOOLWIRE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolwire")
}

/// Load and parse a TOML settings file, returning defaults on any error.
fn load_settings_file(path: &Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}

/// Read a settings file that must exist and parse.
fn read_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
    toml::from_str(&content).map_err(|e| parse_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(
        settings: SettingsFile,
        env_url: Option<&str>,
        servers: Vec<McpServerConfig>,
    ) -> Result<ToolwireConfig, ConfigError> {
        ToolwireConfig::resolve(
            settings,
            env_url.map(str::to_string),
            CliOverrides {
                config_file: None,
                servers,
            },
            PathBuf::from("/tmp/toolwire-test"),
        )
    }

    fn names(config: &ToolwireConfig) -> Vec<&str> {
        config.mcp.servers.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_default_settings() {
        let config = resolve(SettingsFile::default(), None, Vec::new()).unwrap();
        assert!(config.mcp.servers.is_empty());
        assert_eq!(config.mcp.timeouts, McpTimeouts::default());
        assert_eq!(config.mcp.client.name, "toolwire");
    }

    #[test]
    fn test_settings_toml_parse() {
        let toml_str = r#"
[[servers]]
name = "records"
url = "https://records.example.com/mcp"

[[servers]]
name = "search"
url = "http://localhost:8931/mcp"
requires_session = false

[timeouts]
call_ms = 30000

[client]
name = "my-agent"
version = "1.2.3"
"#;
        let settings: SettingsFile = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.servers.len(), 2);
        assert!(settings.servers[0].requires_session);
        assert!(!settings.servers[1].requires_session);
        assert_eq!(settings.timeouts.call_ms, 30_000);
        assert_eq!(settings.timeouts.list_ms, 3000);
        assert_eq!(settings.client.version, "1.2.3");
    }

    #[test]
    fn test_env_url_fills_empty_server_list() {
        let config = resolve(
            SettingsFile::default(),
            Some("http://localhost:3001/mcp"),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(names(&config), vec![DEFAULT_SERVER_NAME]);
        assert_eq!(config.mcp.servers[0].url, "http://localhost:3001/mcp");
    }

    #[test]
    fn test_env_url_ignored_when_file_has_servers() {
        let settings = SettingsFile {
            servers: vec![McpServerConfig::http("records", "http://a.example/mcp")],
            ..SettingsFile::default()
        };
        let config = resolve(settings, Some("http://b.example/mcp"), Vec::new()).unwrap();
        assert_eq!(names(&config), vec!["records"]);
    }

    #[test]
    fn test_cli_servers_replace_in_place_and_append() {
        let settings = SettingsFile {
            servers: vec![
                McpServerConfig::http("a", "http://a.example/mcp"),
                McpServerConfig::http("b", "http://b.example/mcp"),
            ],
            ..SettingsFile::default()
        };
        let config = resolve(
            settings,
            None,
            vec![
                McpServerConfig::http("a", "http://override.example/mcp"),
                McpServerConfig::http("c", "http://c.example/mcp"),
            ],
        )
        .unwrap();
        assert_eq!(names(&config), vec!["a", "b", "c"]);
        assert_eq!(config.mcp.servers[0].url, "http://override.example/mcp");
    }

    #[test]
    fn test_invalid_server_url_is_rejected() {
        let result = resolve(
            SettingsFile::default(),
            None,
            vec![McpServerConfig::http("bad", "not a url")],
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_server_override() {
        let server = parse_server_override("records=http://localhost:9000/mcp").unwrap();
        assert_eq!(server.name, "records");
        assert_eq!(server.url, "http://localhost:9000/mcp");

        for bad in ["records", "=http://x/mcp", "records="] {
            assert!(parse_server_override(bad).is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "servers = 42").unwrap();

        let settings = load_settings_file(&path);
        assert!(settings.servers.is_empty());
        assert!(load_settings_file(&dir.path().join("missing.toml")).servers.is_empty());

        // An explicitly named file must parse.
        assert!(matches!(
            read_settings_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
