//! MCP client error types.

use thiserror::Error;

/// Errors that can occur during MCP client operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server subprocess failed to start.
    #[error("failed to spawn MCP server: {reason}")]
    SpawnFailed { reason: String },

    /// The initialization handshake failed.
    #[error("MCP session initialization failed: {reason}")]
    InitFailed { reason: String },

    /// JSON-RPC communication error (serialization, I/O).
    #[error("transport error: {reason}")]
    TransportError { reason: String },

    /// The server produced no response line (process died or blocked).
    #[error("MCP server did not respond: {reason}")]
    NoResponse { reason: String },

    /// Server returned a JSON-RPC error response.
    #[error("MCP server error [{code}]: {message}")]
    ServerError {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Tool call arguments were not a decodable JSON document.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Server command could not be resolved from the configuration.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}
