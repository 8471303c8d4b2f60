//! JSON-RPC over stdio transport.
//!
//! Handles low-level communication with the MCP server child process:
//! - Writing JSON-RPC requests to stdin
//! - Reading JSON-RPC responses from stdout
//! - Line-delimited JSON protocol (one JSON object per line)
//!
//! The stdin writer and stdout reader live behind a single mutex, so a
//! request and the read of its response form one critical section. Concurrent
//! callers serialize whole request/response pairs instead of racing on the
//! shared streams, which keeps FIFO correlation sound with one process-wide
//! channel.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use super::errors::McpError;
use super::types::{JsonRpcRequest, JsonRpcResponse};

// ─── Transport ───────────────────────────────────────────────────────────────

/// The paired stdin/stdout halves of the server channel.
struct Channel<W, R> {
    writer: W,
    reader: BufReader<R>,
}

/// Bi-directional JSON-RPC transport over a child process's stdio.
///
/// Generic over the stream types so tests can drive it with in-memory duplex
/// pipes; production code uses the [`ChildStdin`]/[`ChildStdout`] defaults.
pub struct StdioTransport<W = ChildStdin, R = ChildStdout> {
    channel: Mutex<Channel<W, R>>,
    next_id: AtomicU64,
}

impl<W, R> StdioTransport<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    /// Create a new transport from the server's stdin/stdout.
    pub fn new(stdin: W, stdout: R) -> Self {
        Self {
            channel: Mutex::new(Channel {
                writer: stdin,
                reader: BufReader::new(stdout),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Send a JSON-RPC request and wait for the matching response.
    ///
    /// Exactly one request is in flight at a time: the channel lock is held
    /// across the write and the response read. Request ids are assigned
    /// monotonically starting at 1.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let mut channel = self.channel.lock().await;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, method, params);

        let mut json = serde_json::to_string(&req).map_err(|e| McpError::TransportError {
            reason: format!("failed to serialize request: {e}"),
        })?;
        json.push('\n');

        channel
            .writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| McpError::TransportError {
                reason: format!("failed to write to stdin: {e}"),
            })?;
        channel
            .writer
            .flush()
            .await
            .map_err(|e| McpError::TransportError {
                reason: format!("failed to flush stdin: {e}"),
            })?;

        // Read lines until one parses as the response for this request.
        // Servers occasionally emit log noise on stdout; skip anything that
        // is not a JSON-RPC response.
        let mut line_buf = String::new();
        loop {
            line_buf.clear();
            let bytes_read = channel
                .reader
                .read_line(&mut line_buf)
                .await
                .map_err(|e| McpError::TransportError {
                    reason: format!("failed to read from stdout: {e}"),
                })?;

            if bytes_read == 0 {
                return Err(McpError::NoResponse {
                    reason: "stdout closed (process may have exited)".into(),
                });
            }

            let trimmed = line_buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(resp) if resp.id == Some(id) => return Ok(resp),
                // Requests are strictly sequential, so a mismatched id should
                // not occur; skip it rather than fail the call.
                Ok(_) | Err(_) => continue,
            }
        }
    }

    /// Send a JSON-RPC notification (no id, no response expected).
    pub async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or_else(|| serde_json::json!({})),
        });

        let mut json =
            serde_json::to_string(&notification).map_err(|e| McpError::TransportError {
                reason: format!("failed to serialize notification: {e}"),
            })?;
        json.push('\n');

        let mut channel = self.channel.lock().await;
        channel
            .writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| McpError::TransportError {
                reason: format!("failed to write notification: {e}"),
            })?;
        channel
            .writer
            .flush()
            .await
            .map_err(|e| McpError::TransportError {
                reason: format!("failed to flush notification: {e}"),
            })
    }
}

// ─── Response Helpers ────────────────────────────────────────────────────────

/// Extract the result from a JSON-RPC response, converting errors to `McpError`.
pub fn extract_result(response: JsonRpcResponse) -> Result<serde_json::Value, McpError> {
    if let Some(err) = response.error {
        return Err(McpError::ServerError {
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }

    // The Business Central server returns `{}` for methods without a payload.
    Ok(response.result.unwrap_or_else(|| serde_json::json!({})))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
