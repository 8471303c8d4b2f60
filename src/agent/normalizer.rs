//! Tool result normalization.
//!
//! The Business Central server returns tool output as a content array whose
//! first element's `text` field may itself be a JSON-encoded string. This
//! module is the single place that collapses that double-encoding into a
//! plain value, so neither the model nor API consumers ever see the envelope.

use serde_json::{json, Value};

use crate::mcp::{McpError, ToolCallEnvelope};

/// Collapse a raw tool-call outcome into a plain JSON value.
///
/// Shapes produced:
/// - `{"data": [...], "context": "..."}` — OData paged collection (payload
///   object carried a `value` field)
/// - the parsed payload itself — any other JSON document
/// - `{"text": "..."}` — content text that is not valid JSON
/// - `{"error": "...", "tool": "..."}` — the envelope's error flag was set,
///   or the invocation itself failed
///
/// Tool failure is data, not control flow: the caller hands in the `Result`
/// and always gets a value back, so the model can react to failures in
/// natural language.
pub fn normalize_tool_result(tool: &str, outcome: Result<Value, McpError>) -> Value {
    let raw = match outcome {
        Ok(raw) => raw,
        Err(e) => {
            return json!({"error": e.to_string(), "tool": tool});
        }
    };

    if !raw.is_object() {
        return raw;
    }

    // The envelope assumption can fail on exotic content items; pass the
    // payload through untouched in that case.
    let Ok(envelope) = serde_json::from_value::<ToolCallEnvelope>(raw.clone()) else {
        return raw;
    };

    if envelope.is_error {
        let error_text = envelope
            .content
            .first()
            .and_then(|item| item.text.clone())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "Tool execution failed".to_string());
        return json!({"error": error_text, "tool": tool});
    }

    let Some(first) = envelope.content.first() else {
        return raw;
    };

    let Some(text) = first.text.as_deref().filter(|t| !t.is_empty()) else {
        // No embedded text — return the content item itself.
        return serde_json::to_value(first).unwrap_or(raw);
    };

    match serde_json::from_str::<Value>(text) {
        Ok(parsed) => {
            if let Some(value) = parsed.get("value") {
                json!({
                    "data": value,
                    "context": parsed
                        .get("@odata.context")
                        .and_then(|c| c.as_str())
                        .unwrap_or(""),
                })
            } else {
                parsed
            }
        }
        Err(_) => json!({"text": text}),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
