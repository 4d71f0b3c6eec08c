//! MCP (Model Context Protocol) client adapter for Toolwire.
//!
//! Talks JSON-RPC 2.0 over HTTP POST to remote tool servers whose responses may
//! be plain JSON or wrapped in event-stream framing. Each configured server gets
//! a lazily established session, its tools are discovered with `tools/list`,
//! their wire schemas are translated into validated parameter contracts, and
//! calls are executed with `tools/call`.

pub mod client;
pub mod config;
pub mod error;
pub mod frame;
pub mod jsonrpc;
pub mod registry;
pub mod schema;
pub mod session;
pub mod tool;
mod transport;

pub use client::{McpClient, ToolDescriptor, probe_endpoint};
pub use config::{ClientInfo, McpConfig, McpServerConfig, McpTimeouts, TransportKind};
pub use error::McpError;
pub use registry::{DiscoveryState, McpRegistry, ToolMap};
pub use schema::{ParameterSchema, Primitive, PrimitiveKind};
pub use tool::McpTool;
