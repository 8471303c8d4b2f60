//! Business Central AI agent service.
//!
//! A thin integration layer between two external systems: the knowall-ai MCP
//! server for Microsoft Dynamics 365 Business Central (spawned as a
//! subprocess, spoken to over JSON-RPC/stdio) and a hosted OpenAI-compatible
//! chat-completion API. The HTTP surface forwards user text to the model and
//! lets the model invoke the MCP server's tools.

pub mod agent;
pub mod config;
pub mod inference;
pub mod mcp;
pub mod rest;

/// Initialize the tracing subscriber.
///
/// Log level comes from `RUST_LOG`, defaulting to info for this crate. Output
/// goes to stdout, which is where the process supervisor expects it.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bc_agent=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
