//! Inference client — OpenAI-compatible API client for the hosted model.
//!
//! This module handles all communication with the chat-completion endpoint:
//! - Non-streaming chat completions with function-calling tools
//! - Request/response types mirroring the OpenAI wire format
//!
//! The client speaks the OpenAI Chat Completions API, so the hosted model is
//! interchangeable via configuration rather than code.

pub mod client;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use client::ChatClient;
pub use errors::InferenceError;
pub use types::{ChatMessage, Role, ToolDefinition};
