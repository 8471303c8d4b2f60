//! HTTP surface.
//!
//! Axum server exposing the chat endpoint and the MCP inspection routes.
//!
//! Endpoints:
//!   GET  /                service descriptor
//!   POST /chat            agent conversation turn
//!   GET  /mcp/status      connection + reachable-resource probe
//!   GET  /mcp/tools       cached tool descriptors
//!   GET  /mcp/resources   per-resource availability
//!   POST /mcp/call        direct tool invocation (debugging)

pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};

pub use state::{AppContext, McpHandle};

/// Build the service router.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/chat", post(routes::chat))
        .route("/mcp/status", get(routes::mcp_status))
        .route("/mcp/tools", get(routes::mcp_tools))
        .route("/mcp/resources", get(routes::mcp_resources))
        .route("/mcp/call", post(routes::mcp_call))
        .with_state(ctx)
}

/// Bind and serve until the shutdown signal resolves.
pub async fn serve(
    ctx: Arc<AppContext>,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let router = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP API listening on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
