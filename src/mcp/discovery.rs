//! Capability discovery.
//!
//! Probes which Business Central resources are actually reachable through the
//! server by issuing a minimal `list_items(resource, top=1)` per candidate.
//! Tenants differ in which API entities are enabled, so the reachable set is
//! an empirical question, not a static one.

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};

use super::client::BcMcpClient;
use super::errors::McpError;
use super::types::McpToolDefinition;

// ─── Probe Lists ─────────────────────────────────────────────────────────────

/// Resources most tenants expose; probed by `discover_all` and `/mcp/status`.
pub const COMMON_RESOURCES: &[&str] = &[
    "companies",
    "customers",
    "contacts",
    "items",
    "vendors",
    "salesOpportunities",
    "salesQuotes",
    "salesOrders",
    "salesInvoices",
];

/// Extended list used by `/mcp/resources`, including purchase documents.
pub const ALL_RESOURCES: &[&str] = &[
    "companies",
    "customers",
    "contacts",
    "items",
    "vendors",
    "salesOpportunities",
    "salesQuotes",
    "salesOrders",
    "salesInvoices",
    "purchaseOrders",
];

/// Truncation limit for per-resource probe errors in reports.
const PROBE_ERROR_LIMIT: usize = 100;

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Everything `discover_all` learns about the server.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub tools: Vec<McpToolDefinition>,
    pub available_resources: Vec<String>,
    pub total_tools: usize,
    pub total_resources: usize,
}

/// Reachability of a single probed resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceStatus {
    pub name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ─── Discovery ───────────────────────────────────────────────────────────────

/// Discover the server's tools and which common resources are reachable.
pub async fn discover_all<W, R>(
    client: &BcMcpClient<W, R>,
) -> Result<DiscoveryReport, McpError>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    let tools = client.list_tools().await?;
    tracing::info!(tools = tools.len(), "discovering MCP capabilities");

    let mut available_resources = Vec::new();
    for resource in COMMON_RESOURCES {
        match client.list_items(resource, None, Some(1), None).await {
            Ok(_) => {
                tracing::debug!(resource, "available");
                available_resources.push(resource.to_string());
            }
            Err(e) => {
                tracing::debug!(resource, error = %e, "unavailable");
            }
        }
    }

    Ok(DiscoveryReport {
        total_tools: tools.len(),
        total_resources: available_resources.len(),
        tools,
        available_resources,
    })
}

/// Probe each named resource, reporting per-resource status and error text.
pub async fn probe_resources<W, R>(
    client: &BcMcpClient<W, R>,
    resources: &[&str],
) -> Vec<ResourceStatus>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    let mut statuses = Vec::with_capacity(resources.len());
    for resource in resources {
        let status = match client.list_items(resource, None, Some(1), None).await {
            Ok(_) => ResourceStatus {
                name: resource.to_string(),
                status: "available",
                error: None,
            },
            Err(e) => {
                let mut error = e.to_string();
                error.truncate(PROBE_ERROR_LIMIT);
                ResourceStatus {
                    name: resource.to_string(),
                    status: "unavailable",
                    error: Some(error),
                }
            }
        };
        statuses.push(status);
    }
    statuses
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::testing::spawn_fake_server;

    /// Fake server exposing two tools and failing probes for every resource
    /// not in the reachable set.
    fn reachable_fixture(
        reachable: &'static [&'static str],
    ) -> crate::mcp::testing::FakeTransport {
        let (transport, _seen) = spawn_fake_server(move |method, params| match method {
            "tools/list" => Some(serde_json::json!({
                "tools": [
                    {"name": "list_items", "description": "List records"},
                    {"name": "get_schema", "description": "Resource metadata"},
                ]
            })),
            "tools/call" => {
                let resource = params["arguments"]["resource"].as_str().unwrap_or("");
                if reachable.iter().any(|&r| r == resource) {
                    Some(serde_json::json!({
                        "content": [{"type": "text", "text": "{\"value\": []}"}],
                    }))
                } else {
                    None // JSON-RPC error → probe counts as unavailable
                }
            }
            _ => None,
        });
        transport
    }

    #[tokio::test]
    async fn test_discover_all_counts_reachable_resources() {
        let client = BcMcpClient::from_transport(reachable_fixture(&[
            "companies",
            "customers",
            "items",
        ]));

        let report = discover_all(&client).await.unwrap();
        assert_eq!(report.total_tools, 2);
        assert_eq!(report.total_resources, 3);
        assert_eq!(
            report.available_resources,
            vec!["companies", "customers", "items"]
        );
    }

    #[tokio::test]
    async fn test_discover_all_with_no_reachable_resources() {
        let client = BcMcpClient::from_transport(reachable_fixture(&[]));

        let report = discover_all(&client).await.unwrap();
        assert_eq!(report.total_resources, 0);
        assert!(report.available_resources.is_empty());
    }

    #[tokio::test]
    async fn test_probe_resources_reports_errors() {
        let client = BcMcpClient::from_transport(reachable_fixture(&["customers"]));

        let statuses = probe_resources(&client, &["customers", "purchaseOrders"]).await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].status, "available");
        assert!(statuses[0].error.is_none());
        assert_eq!(statuses[1].status, "unavailable");
        assert!(statuses[1].error.as_deref().unwrap().len() <= PROBE_ERROR_LIMIT);
    }
}
