//! Service entry point.
//!
//! Startup order matters: tracing first, then configuration (fatal when
//! required values are missing), then the HTTP server. The MCP subprocess
//! starts on a background task so the HTTP surface comes up immediately —
//! MCP-dependent routes answer 503 until the handshake completes.

use std::sync::Arc;

use anyhow::Context;

use bc_agent::config::AppConfig;
use bc_agent::inference::ChatClient;
use bc_agent::rest::{self, AppContext, McpHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bc_agent::init_tracing();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        company = %config.bc.company,
        auth = config.bc.auth.as_str(),
        model = %config.model,
        port = config.port,
        "starting Business Central agent service"
    );

    let chat = match config.openai_api_key {
        Some(ref key) => Some(
            ChatClient::new(key.clone(), config.model.clone())
                .context("failed to build chat client")?,
        ),
        None => {
            tracing::warn!("OPENAI_API_KEY is not set — /chat will answer 503");
            None
        }
    };

    let ctx = Arc::new(AppContext::new(chat));

    // Start the MCP subprocess in the background and install the handle once
    // the handshake and tool fetch complete.
    let init_ctx = ctx.clone();
    let bc_config = config.bc.clone();
    tokio::spawn(async move {
        match McpHandle::start(&bc_config).await {
            Ok(handle) => init_ctx.install_mcp(handle).await,
            Err(e) => {
                tracing::error!(error = %e, "failed to initialize MCP client");
            }
        }
    });

    let shutdown_ctx = ctx.clone();
    rest::serve(ctx, config.port, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await?;

    // Terminate the subprocess on the way out.
    if let Some(handle) = shutdown_ctx.take_mcp().await {
        handle.client.stop().await;
    }

    Ok(())
}
