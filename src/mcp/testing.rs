//! In-memory fake MCP server for unit tests.
//!
//! Drives a [`StdioTransport`] over duplex pipes: one task plays the server,
//! reading line-delimited JSON-RPC from its end and answering through a
//! caller-supplied handler. Each response is preceded by a non-JSON log line
//! to exercise the transport's noise skipping.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::Mutex;

use super::transport::StdioTransport;

/// Transport type backed by in-memory pipes.
pub type FakeTransport = StdioTransport<DuplexStream, DuplexStream>;

/// Spawn a fake server and return a connected transport plus the log of every
/// request/notification the server received (raw JSON values, in order).
///
/// The handler is called once per request carrying an id, with the method and
/// params; returning `Some(result)` produces a success response, `None` a
/// `-32601` error response. Notifications (no id) are recorded but never
/// answered.
pub fn spawn_fake_server<F>(
    handler: F,
) -> (FakeTransport, Arc<Mutex<Vec<serde_json::Value>>>)
where
    F: Fn(&str, &serde_json::Value) -> Option<serde_json::Value> + Send + 'static,
{
    let (client_writer, server_reader) = tokio::io::duplex(64 * 1024);
    let (server_writer, client_reader) = tokio::io::duplex(64 * 1024);

    let seen: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_task = seen.clone();

    tokio::spawn(async move {
        let mut reader = BufReader::new(server_reader);
        let mut writer = server_writer;
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let request: serde_json::Value = match serde_json::from_str(line.trim()) {
                Ok(v) => v,
                Err(_) => continue,
            };
            seen_task.lock().await.push(request.clone());

            let Some(id) = request.get("id").and_then(|v| v.as_u64()) else {
                continue; // notification — no response
            };
            let method = request["method"].as_str().unwrap_or_default();
            let params = request
                .get("params")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));

            let response = match handler(method, &params) {
                Some(result) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": result,
                }),
                None => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": format!("method not found: {method}")},
                }),
            };

            let payload = format!(
                "[fake-server] handling {method}\n{}\n",
                serde_json::to_string(&response).unwrap()
            );
            if writer.write_all(payload.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    (StdioTransport::new(client_writer, client_reader), seen)
}
