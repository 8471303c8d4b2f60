//! The agent loop: one completion, optional tool calls, one follow-up.
//!
//! Drives a single request/response cycle against the chat-completion API.
//! When the model requests tool calls they are executed sequentially, in the
//! order requested, against the single subprocess-backed MCP channel (which
//! cannot multiplex). Each result is normalized and appended as a tool-role
//! message before the follow-up completion, which runs with tools disabled so
//! the model answers instead of chaining further calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::inference::client::ChatClient;
use crate::inference::errors::InferenceError;
use crate::inference::types::{
    ChatMessage, FunctionDefinition, ToolDefinition,
};
use crate::mcp::client::BcMcpClient;
use crate::mcp::errors::McpError;
use crate::mcp::types::McpToolDefinition;

use super::normalizer::normalize_tool_result;

// ─── System Prompt ───────────────────────────────────────────────────────────

/// System prompt seeded into every conversation.
pub const SYSTEM_PROMPT: &str = "\
You are an AI assistant with access to Microsoft Dynamics 365 Business Central via MCP.

You can query and answer questions about any Business Central data, including:
- customers: customer records, addresses, contacts
- contacts: contact persons
- items: product catalog, inventory, prices
- vendors: vendor information
- salesOrders: sales orders
- salesQuotes: sales quotes
- salesInvoices: sales invoices
- purchaseOrders: purchase orders
- and any other resources exposed by the API

Available tools:
- list_items: list records from a resource (supports OData filters, top, skip)
- get_items_by_field: find records by a specific field value
- get_schema: get structure/metadata of a resource
- create_item: create new records
- update_item: update existing records
- delete_item: delete records

When the user asks a specific question, use the tools to fetch real data and answer accurately.
Respond in a clear, professional way. If a tool fails, explain what went wrong in a helpful way.";

// ─── Types ───────────────────────────────────────────────────────────────────

/// One executed tool call: what was asked for and what came back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallTrace {
    pub name: String,
    pub arguments: Value,
    pub result: Value,
}

/// The agent's reply to one user message.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub response: String,
    /// Present only when the turn involved tool calls.
    pub tool_calls: Option<Vec<ToolCallTrace>>,
}

// ─── Tool Translation ────────────────────────────────────────────────────────

/// Translate MCP tool descriptors into the OpenAI function-calling schema.
pub fn mcp_tools_to_openai(tools: &[McpToolDefinition]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|tool| ToolDefinition {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name.clone(),
                description: if tool.description.is_empty() {
                    "Business Central tool".to_string()
                } else {
                    tool.description.clone()
                },
                parameters: if tool.input_schema.is_null() {
                    serde_json::json!({"type": "object", "properties": {}})
                } else {
                    tool.input_schema.clone()
                },
            },
        })
        .collect()
}

// ─── Agent Loop ──────────────────────────────────────────────────────────────

/// Process one user message against the conversation history.
///
/// Returns the assistant's text plus, when tools ran, the per-call trace.
/// A failing tool call becomes an `{error, tool}` result for that call only;
/// the remaining calls and the loop continue.
pub async fn process_message<W, R>(
    chat: &ChatClient,
    mcp: &BcMcpClient<W, R>,
    tools: &[McpToolDefinition],
    history: &[ChatMessage],
    user_message: &str,
) -> Result<AgentReply, InferenceError>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    let mut messages = history.to_vec();
    messages.push(ChatMessage::user(user_message));

    let first = chat
        .chat_completion(messages.clone(), Some(mcp_tools_to_openai(tools)))
        .await?;

    let requested = first.tool_calls().to_vec();
    if requested.is_empty() {
        return Ok(AgentReply {
            response: first.content.unwrap_or_default(),
            tool_calls: None,
        });
    }

    tracing::info!(count = requested.len(), "model requested tool calls");
    messages.push(ChatMessage::assistant_tool_calls(
        first.content.clone(),
        requested.clone(),
    ));

    let mut traces = Vec::with_capacity(requested.len());
    for call in &requested {
        let name = &call.function.name;

        let (arguments, outcome) =
            match serde_json::from_str::<Value>(&call.function.arguments) {
                Ok(args) => {
                    let outcome = mcp.call_tool(name, args.clone()).await;
                    (args, outcome)
                }
                Err(e) => (
                    Value::Null,
                    Err(McpError::InvalidArguments {
                        tool: name.clone(),
                        reason: e.to_string(),
                    }),
                ),
            };

        if let Err(ref e) = outcome {
            tracing::warn!(tool = %name, error = %e, "tool call failed");
        }

        let normalized = normalize_tool_result(name, outcome);
        messages.push(ChatMessage::tool(call.id.clone(), encode_tool_content(&normalized)));
        traces.push(ToolCallTrace {
            name: name.clone(),
            arguments,
            result: normalized,
        });
    }

    let second = chat.chat_completion(messages, None).await?;

    Ok(AgentReply {
        response: second.content.unwrap_or_default(),
        tool_calls: Some(traces),
    })
}

/// Encode a normalized result for a tool-role message.
///
/// Plain strings go through verbatim — JSON-encoding them again would wrap
/// the text in quotes and read as malformed to the model.
fn encode_tool_content(result: &Value) -> String {
    match result.as_str() {
        Some(s) => s.to_string(),
        None => serde_json::to_string(result).unwrap_or_default(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, description: &str, schema: Value) -> McpToolDefinition {
        McpToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema: schema,
        }
    }

    #[test]
    fn test_tools_translate_to_function_schema() {
        let tools = vec![descriptor(
            "list_items",
            "List records from a resource",
            serde_json::json!({
                "type": "object",
                "properties": {"resource": {"type": "string"}},
                "required": ["resource"],
            }),
        )];

        let translated = mcp_tools_to_openai(&tools);
        assert_eq!(translated.len(), 1);
        assert_eq!(translated[0].r#type, "function");
        assert_eq!(translated[0].function.name, "list_items");
        assert_eq!(
            translated[0].function.parameters["required"],
            serde_json::json!(["resource"])
        );
    }

    #[test]
    fn test_missing_schema_and_description_get_defaults() {
        let tools = vec![descriptor("get_schema", "", Value::Null)];

        let translated = mcp_tools_to_openai(&tools);
        assert_eq!(translated[0].function.description, "Business Central tool");
        assert_eq!(translated[0].function.parameters["type"], "object");
    }

    #[test]
    fn test_encode_tool_content_avoids_double_encoding() {
        assert_eq!(
            encode_tool_content(&Value::String("plain text".into())),
            "plain text"
        );
        assert_eq!(
            encode_tool_content(&serde_json::json!({"data": []})),
            r#"{"data":[]}"#
        );
    }
}
