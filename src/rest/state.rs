//! Shared application state.
//!
//! One `AppContext` is built at startup and handed to every request handler.
//! The MCP side starts asynchronously: the slot stays `None` until the
//! subprocess handshake and tool fetch complete, and MCP-dependent routes
//! answer 503 in the meantime.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::agent::ConversationStore;
use crate::config::BcConfig;
use crate::inference::ChatClient;
use crate::mcp::{BcMcpClient, McpError, McpToolDefinition};

/// A started MCP connection plus its immutable tool descriptor cache.
///
/// Tools are fetched once here and never refreshed — the cache is valid for
/// the subprocess lifetime.
pub struct McpHandle {
    pub client: BcMcpClient,
    pub tools: Vec<McpToolDefinition>,
}

impl McpHandle {
    /// Spawn the server, run the handshake, and cache the tool list.
    pub async fn start(config: &BcConfig) -> Result<Self, McpError> {
        let client = BcMcpClient::start(config).await?;
        let tools = client.list_tools().await?;
        tracing::info!(tools = tools.len(), "MCP client ready");
        Ok(Self { client, tools })
    }
}

/// State shared by all HTTP handlers.
pub struct AppContext {
    /// Hosted-model client; `None` when the API key is not configured.
    pub chat: Option<ChatClient>,
    /// MCP connection; `None` until async startup completes.
    mcp: RwLock<Option<Arc<McpHandle>>>,
    /// Bounded conversation histories.
    pub conversations: Mutex<ConversationStore>,
    pub started_at: DateTime<Utc>,
}

impl AppContext {
    /// Create the context with an empty MCP slot.
    pub fn new(chat: Option<ChatClient>) -> Self {
        Self {
            chat,
            mcp: RwLock::new(None),
            conversations: Mutex::new(ConversationStore::default()),
            started_at: Utc::now(),
        }
    }

    /// Install the MCP handle once startup has completed.
    pub async fn install_mcp(&self, handle: McpHandle) {
        *self.mcp.write().await = Some(Arc::new(handle));
    }

    /// The MCP handle, if startup has completed.
    pub async fn mcp(&self) -> Option<Arc<McpHandle>> {
        self.mcp.read().await.clone()
    }

    /// Take the handle back out (used during shutdown to stop the subprocess).
    pub async fn take_mcp(&self) -> Option<Arc<McpHandle>> {
        self.mcp.write().await.take()
    }
}
