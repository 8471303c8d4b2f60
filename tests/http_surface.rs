//! HTTP surface tests against a real listener.
//!
//! Boots the axum router on an ephemeral port with an empty MCP slot and no
//! model credential — the startup-race configuration — and verifies that
//! every MCP-dependent route answers 503 without touching anything.

use std::sync::Arc;

use serde_json::Value;

use bc_agent::rest::{build_router, AppContext};

async fn serve_bare_context() -> String {
    let ctx = Arc::new(AppContext::new(None));
    let router = build_router(ctx);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn root_descriptor_is_served() {
    let base = serve_bare_context().await;
    let response = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["service"], "Business Central AI Agent (MCP)");
    assert_eq!(body["endpoints"]["mcp_call"], "/mcp/call");
}

#[tokio::test]
async fn mcp_routes_answer_503_before_startup() {
    let base = serve_bare_context().await;
    let http = reqwest::Client::new();

    for path in ["/mcp/status", "/mcp/tools", "/mcp/resources"] {
        let response = http.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(response.status(), 503, "{path} should be unavailable");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "MCP client not initialized");
    }

    let response = http
        .post(format!("{base}/mcp/call"))
        .json(&serde_json::json!({"name": "list_items", "arguments": {"resource": "customers"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn chat_answers_503_before_startup() {
    let base = serve_bare_context().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&serde_json::json!({"message": "list the first 5 customers"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}
