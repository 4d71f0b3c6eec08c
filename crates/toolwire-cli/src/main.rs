//! Toolwire CLI: inspect and call tools exposed by MCP servers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use toolwire_config::{CliOverrides, ToolwireConfig, parse_server_override};
use toolwire_mcp::{DiscoveryState, McpRegistry, ToolMap};
use toolwire_types::{Tool, ToolContext, ToolError};

#[derive(Parser)]
#[command(name = "toolwire", version, about = "Inspect and call MCP tool servers")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Add or replace a server (repeatable)
    #[arg(long = "server", value_name = "NAME=URL", global = true)]
    servers: Vec<String>,

    /// Read configuration from this file instead of ~/.toolwire/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List configured servers
    Servers,
    /// Discover tools from all servers, or from one
    Tools {
        /// Only this server
        #[arg(long = "from", value_name = "SERVER")]
        server: Option<String>,
    },
    /// Call a tool by name
    Call {
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
    },
    /// Check whether a configured server answers
    Available { server: String },
    /// Run initialize and tools/list against any endpoint
    Probe { url: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let servers = cli
        .servers
        .iter()
        .map(|entry| parse_server_override(entry))
        .collect::<Result<Vec<_>, _>>()?;
    let config = ToolwireConfig::load(CliOverrides {
        config_file: cli.config,
        servers,
    })
    .context("Failed to load configuration")?;

    let registry = McpRegistry::new(&config.mcp).context("Failed to set up MCP servers")?;

    // Ctrl-C aborts whatever is in flight
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    match cli.command {
        Command::Servers => {
            print_servers(&config, &registry);
            Ok(ExitCode::SUCCESS)
        }
        Command::Tools { server } => {
            let tools = match server {
                Some(name) => registry.tools_for(&name, &cancel).await?,
                None => registry.all_tools(&cancel).await,
            };
            print_tools(&tools);
            Ok(ExitCode::SUCCESS)
        }
        Command::Call { tool, args } => call_tool(&registry, &tool, args.as_deref(), cancel).await,
        Command::Available { server } => {
            if config.mcp.server(&server).is_none() {
                anyhow::bail!("Unknown MCP server: {server}");
            }
            if registry.is_available(&server).await {
                println!("{server}: available");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{server}: unavailable");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Probe { url } => {
            let tools = registry
                .probe(&url, &cancel)
                .await
                .with_context(|| format!("Probe of {url} failed"))?;
            println!("{url}: {} tool(s)", tools.len());
            for tool in tools {
                println!("  {:<24} {}", tool.name, tool.description);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_servers(config: &ToolwireConfig, registry: &McpRegistry) {
    if config.mcp.servers.is_empty() {
        eprintln!(
            "No MCP servers configured. Add [[servers]] to {} or set MCP_SERVER_URL.",
            config.config_dir.join("config.toml").display()
        );
        return;
    }
    for server in &config.mcp.servers {
        let state = match registry.state(&server.name) {
            Some(DiscoveryState::Loaded(n)) => format!("{n} tool(s)"),
            Some(DiscoveryState::Unavailable) => "unavailable".to_string(),
            _ => "not discovered".to_string(),
        };
        println!("{:<16} {}  ({state})", server.name, server.url);
    }
}

fn print_tools(tools: &ToolMap) {
    if tools.is_empty() {
        eprintln!("No tools available.");
        return;
    }
    let mut names: Vec<&String> = tools.keys().collect();
    names.sort();
    for name in names {
        let tool = &tools[name];
        println!("{name}  [{}]", tool.server_name());
        if !tool.description().is_empty() {
            println!("    {}", tool.description());
        }
        for (param, primitive) in tool.parameters().iter() {
            let mut flags = Vec::new();
            if primitive.nullable {
                flags.push("nullable");
            }
            if primitive.optional {
                flags.push("optional");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };
            println!("    - {param}: {}{flags}", primitive.kind.as_str());
        }
    }
}

async fn call_tool(
    registry: &McpRegistry,
    name: &str,
    args: Option<&str>,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let input: serde_json::Value = match args {
        Some(raw) => serde_json::from_str(raw).context("--args must be valid JSON")?,
        None => serde_json::json!({}),
    };

    let tools = registry.all_tools(&cancel).await;
    let result = match tools.get(name) {
        Some(tool) => tool.execute(input, ToolContext::new(cancel)).await,
        None => Err(ToolError::UnknownTool {
            name: name.to_string(),
        }),
    };

    match result {
        Ok(output) => {
            println!("{}", output.render());
            if output.is_error {
                eprintln!("Tool '{name}' reported an error");
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
