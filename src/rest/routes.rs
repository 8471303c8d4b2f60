//! HTTP route handlers.
//!
//! Thin adapters between the HTTP surface and the agent/MCP layers. Every
//! MCP-dependent handler checks the startup slot first and answers 503
//! without touching the subprocess when it is still empty.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::agent::{self, ToolCallTrace, SYSTEM_PROMPT};
use crate::mcp::discovery::{self, ALL_RESOURCES};

use super::state::{AppContext, McpHandle};

type HandlerError = (StatusCode, Json<Value>);

fn service_unavailable(detail: &str) -> HandlerError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": detail})),
    )
}

fn internal_error(detail: impl ToString) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": detail.to_string()})),
    )
}

/// Fetch the MCP handle or answer 503 while startup is incomplete.
async fn mcp_or_unavailable(ctx: &AppContext) -> Result<Arc<McpHandle>, HandlerError> {
    ctx.mcp()
        .await
        .ok_or_else(|| service_unavailable("MCP client not initialized"))
}

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallTrace>>,
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct McpStatusResponse {
    pub status: &'static str,
    pub tools_available: usize,
    pub tools: Vec<ToolSummary>,
    pub resources_available: usize,
    pub resources: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /` — service descriptor.
pub async fn root(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!({
        "service": "Business Central AI Agent (MCP)",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "started_at": ctx.started_at.to_rfc3339(),
        "mcp_server": "knowall-ai/mcp-business-central",
        "endpoints": {
            "chat": "/chat",
            "mcp_status": "/mcp/status",
            "mcp_tools": "/mcp/tools",
            "mcp_resources": "/mcp/resources",
            "mcp_call": "/mcp/call",
        },
    }))
}

/// `POST /chat` — forward a user message through the agent loop.
pub async fn chat(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, HandlerError> {
    let handle = mcp_or_unavailable(&ctx).await?;
    let chat_client = ctx
        .chat
        .as_ref()
        .ok_or_else(|| service_unavailable("OpenAI not configured. Set OPENAI_API_KEY."))?;

    let conversation_id = request
        .conversation_id
        .clone()
        .unwrap_or_else(|| format!("conv_{}", Uuid::new_v4().simple()));

    let history = {
        let mut conversations = ctx.conversations.lock().expect("conversation lock");
        conversations.history(&conversation_id, SYSTEM_PROMPT)
    };

    let reply = agent::process_message(
        chat_client,
        &handle.client,
        &handle.tools,
        &history,
        &request.message,
    )
    .await
    .map_err(internal_error)?;

    {
        let mut conversations = ctx.conversations.lock().expect("conversation lock");
        conversations.append(
            &conversation_id,
            [
                crate::inference::ChatMessage::user(request.message.clone()),
                crate::inference::ChatMessage::assistant(reply.response.clone()),
            ],
        );
    }

    Ok(Json(ChatResponse {
        response: reply.response,
        tool_calls: reply.tool_calls,
        conversation_id,
    }))
}

/// `GET /mcp/status` — connection status plus reachable-resource probe.
pub async fn mcp_status(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<McpStatusResponse>, HandlerError> {
    let handle = mcp_or_unavailable(&ctx).await?;

    let report = discovery::discover_all(&handle.client)
        .await
        .map_err(internal_error)?;

    Ok(Json(McpStatusResponse {
        status: "connected",
        tools_available: report.total_tools,
        tools: report
            .tools
            .iter()
            .map(|tool| ToolSummary {
                name: tool.name.clone(),
                description: tool.description.clone(),
            })
            .collect(),
        resources_available: report.total_resources,
        resources: report.available_resources,
    }))
}

/// `GET /mcp/tools` — the cached tool descriptors.
pub async fn mcp_tools(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, HandlerError> {
    let handle = mcp_or_unavailable(&ctx).await?;
    Ok(Json(json!({"tools": handle.tools})))
}

/// `GET /mcp/resources` — per-resource reachability.
pub async fn mcp_resources(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, HandlerError> {
    let handle = mcp_or_unavailable(&ctx).await?;
    let statuses = discovery::probe_resources(&handle.client, ALL_RESOURCES).await;
    Ok(Json(json!({"resources": statuses})))
}

/// `POST /mcp/call` — direct tool invocation for debugging.
pub async fn mcp_call(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<CallToolRequest>,
) -> Result<Json<Value>, HandlerError> {
    let handle = mcp_or_unavailable(&ctx).await?;

    let arguments = if request.arguments.is_null() {
        json!({})
    } else {
        request.arguments
    };

    handle
        .client
        .call_tool(&request.name, arguments)
        .await
        .map(Json)
        .map_err(internal_error)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_context() -> Arc<AppContext> {
        Arc::new(AppContext::new(None))
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let Json(body) = root(State(bare_context())).await;
        assert_eq!(body["service"], "Business Central AI Agent (MCP)");
        assert_eq!(body["endpoints"]["chat"], "/chat");
        assert_eq!(body["endpoints"]["mcp_status"], "/mcp/status");
    }

    #[tokio::test]
    async fn test_chat_before_startup_is_unavailable() {
        let err = chat(
            State(bare_context()),
            Json(ChatRequest {
                message: "hello".into(),
                conversation_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_mcp_routes_before_startup_are_unavailable() {
        let err = mcp_status(State(bare_context())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);

        let err = mcp_tools(State(bare_context())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);

        let err = mcp_resources(State(bare_context())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);

        let err = mcp_call(
            State(bare_context()),
            Json(CallToolRequest {
                name: "list_items".into(),
                arguments: json!({"resource": "customers"}),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_chat_request_accepts_missing_conversation_id() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message": "list customers"}"#).unwrap();
        assert!(request.conversation_id.is_none());
    }

    #[test]
    fn test_call_tool_request_defaults_arguments() {
        let request: CallToolRequest =
            serde_json::from_str(r#"{"name": "get_schema"}"#).unwrap();
        assert!(request.arguments.is_null());
    }
}
