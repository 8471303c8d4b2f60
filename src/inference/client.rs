//! OpenAI-compatible chat completion client.
//!
//! Sends non-streaming chat completion requests to the hosted model endpoint.
//! The base URL is configurable so tests (and OpenAI-compatible gateways) can
//! point the client elsewhere.

use std::time::Duration;

use reqwest::Client as HttpClient;

use super::errors::InferenceError;
use super::types::{AssistantMessage, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ToolDefinition};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default hosted endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total request timeout. Tool-heavy completions on large models can take a
/// while; this bounds a wedged connection, not normal latency.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ─── ChatClient ──────────────────────────────────────────────────────────────

/// Client for the hosted chat-completion API.
pub struct ChatClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// Create a client for the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, InferenceError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: OPENAI_BASE_URL.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Override the API base URL (OpenAI-compatible gateways, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat completion request and return the assistant's reply.
    ///
    /// When `tools` is set, `tool_choice` is `"auto"` — the model decides
    /// whether to call anything. Passing `None` disables tool calling for the
    /// turn, which the agent loop uses for its second completion.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<AssistantMessage, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            tool_choice: tools.as_ref().map(|_| "auto".to_string()),
            tools,
            messages,
        };

        tracing::debug!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            tool_count = body.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "chat completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| InferenceError::DecodeError {
                    reason: e.to_string(),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(InferenceError::EmptyResponse)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
