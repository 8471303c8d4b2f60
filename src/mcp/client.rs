//! High-level client for the Business Central MCP server.
//!
//! Owns the server subprocess and exposes the MCP operations (`tools/list`,
//! `tools/call`) plus the Business Central convenience calls built on top of
//! them. A client only exists once the subprocess is running and the
//! handshake has completed, so "not started" is not a representable state
//! here — callers that may race startup hold an `Option` of this type.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use crate::config::BcConfig;

use super::errors::McpError;
use super::lifecycle::{self, read_stderr_tail};
use super::transport::{extract_result, StdioTransport};
use super::types::{McpToolDefinition, ToolsListResult};

// ─── BcMcpClient ─────────────────────────────────────────────────────────────

/// Client for the Business Central MCP server (knowall-ai).
///
/// Communicates over stdio using JSON-RPC 2.0, one message per line. Generic
/// over the stream types so tests can connect it to in-memory pipes.
pub struct BcMcpClient<W = ChildStdin, R = ChildStdout> {
    transport: StdioTransport<W, R>,
    process: Mutex<Option<Child>>,
    stderr: Mutex<Option<ChildStderr>>,
}

impl BcMcpClient {
    /// Spawn the server subprocess and initialize the MCP session.
    pub async fn start(config: &BcConfig) -> Result<Self, McpError> {
        let spawned = lifecycle::spawn_server(config)?;
        let mut process = spawned.process;
        let transport = spawned.transport;
        let mut stderr = spawned.stderr;

        if let Err(e) = lifecycle::initialize(&transport).await {
            let tail = read_stderr_tail(stderr.take()).await;
            let _ = process.kill().await;
            let reason = if tail.is_empty() {
                e.to_string()
            } else {
                format!("{e} | stderr: {}", tail.trim())
            };
            return Err(McpError::InitFailed { reason });
        }

        Ok(Self {
            transport,
            process: Mutex::new(Some(process)),
            stderr: Mutex::new(stderr),
        })
    }

    /// Terminate the server subprocess.
    pub async fn stop(&self) {
        if let Some(mut process) = self.process.lock().await.take() {
            let _ = process.kill().await;
            tracing::info!("MCP server stopped");
        }
    }
}

impl<W, R> BcMcpClient<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    /// Wrap an already-connected transport.
    ///
    /// Used by in-memory test harnesses; production code goes through
    /// [`BcMcpClient::start`].
    pub fn from_transport(transport: StdioTransport<W, R>) -> Self {
        Self {
            transport,
            process: Mutex::new(None),
            stderr: Mutex::new(None),
        }
    }

    /// Send a JSON-RPC request and return the `result` payload.
    ///
    /// A silent channel (no response line) is augmented with whatever the
    /// subprocess wrote to stderr, which is usually the actual failure.
    async fn send(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let response = match self.transport.request(method, params).await {
            Ok(resp) => resp,
            Err(McpError::NoResponse { reason }) => {
                let tail = read_stderr_tail(self.stderr.lock().await.take()).await;
                let reason = if tail.is_empty() {
                    reason
                } else {
                    format!("{reason} | stderr: {}", tail.trim())
                };
                return Err(McpError::NoResponse { reason });
            }
            Err(e) => return Err(e),
        };

        extract_result(response)
    }

    // ─── MCP Operations ──────────────────────────────────────────────────

    /// Return all tools exposed by the server.
    pub async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        let result = self.send("tools/list", None).await?;
        let parsed: ToolsListResult =
            serde_json::from_value(result).map_err(|e| McpError::TransportError {
                reason: format!("failed to parse tools/list response: {e}"),
            })?;
        Ok(parsed.tools)
    }

    /// Call a tool by name with the given arguments.
    ///
    /// Returns the raw result envelope; schema conformance of `arguments` is
    /// the server's responsibility.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        self.send(
            "tools/call",
            Some(serde_json::json!({
                "name": name,
                "arguments": arguments,
            })),
        )
        .await
    }

    // ─── Business Central Convenience Calls ──────────────────────────────

    /// Get OData schema/metadata for a resource.
    pub async fn get_schema(&self, resource: &str) -> Result<serde_json::Value, McpError> {
        self.call_tool("get_schema", serde_json::json!({"resource": resource}))
            .await
    }

    /// List items from a resource with optional OData filter and pagination.
    pub async fn list_items(
        &self,
        resource: &str,
        filter: Option<&str>,
        top: Option<u32>,
        skip: Option<u32>,
    ) -> Result<serde_json::Value, McpError> {
        let mut args = serde_json::json!({"resource": resource});
        if let Some(filter) = filter {
            args["filter"] = serde_json::json!(filter);
        }
        if let Some(top) = top {
            args["top"] = serde_json::json!(top);
        }
        if let Some(skip) = skip {
            args["skip"] = serde_json::json!(skip);
        }
        self.call_tool("list_items", args).await
    }

    /// Get items matching a given field value.
    pub async fn get_items_by_field(
        &self,
        resource: &str,
        field: &str,
        value: &str,
    ) -> Result<serde_json::Value, McpError> {
        self.call_tool(
            "get_items_by_field",
            serde_json::json!({"resource": resource, "field": field, "value": value}),
        )
        .await
    }

    /// Create a new item in the given resource.
    pub async fn create_item(
        &self,
        resource: &str,
        item_data: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        self.call_tool(
            "create_item",
            serde_json::json!({"resource": resource, "item_data": item_data}),
        )
        .await
    }

    /// Update an existing item by id.
    pub async fn update_item(
        &self,
        resource: &str,
        item_id: &str,
        item_data: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        self.call_tool(
            "update_item",
            serde_json::json!({
                "resource": resource,
                "item_id": item_id,
                "item_data": item_data,
            }),
        )
        .await
    }

    /// Delete an item by id.
    pub async fn delete_item(
        &self,
        resource: &str,
        item_id: &str,
    ) -> Result<serde_json::Value, McpError> {
        self.call_tool(
            "delete_item",
            serde_json::json!({"resource": resource, "item_id": item_id}),
        )
        .await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
