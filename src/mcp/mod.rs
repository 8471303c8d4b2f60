//! MCP client — JSON-RPC over stdio to the Business Central server.
//!
//! This module handles:
//! - Spawning the server subprocess (command resolution per auth mode)
//! - JSON-RPC 2.0 communication over process stdio, one request in flight
//! - The one-time MCP handshake (protocol version negotiation)
//! - Tool listing and invocation, plus Business Central convenience calls
//! - Reachability probing of common Business Central resources

pub mod client;
pub mod discovery;
pub mod errors;
pub mod lifecycle;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use client::BcMcpClient;
pub use errors::McpError;
pub use types::{McpToolDefinition, ToolCallEnvelope, ToolContent};
