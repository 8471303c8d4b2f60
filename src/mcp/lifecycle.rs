//! Server process lifecycle.
//!
//! Resolves the Business Central MCP server command from the configuration,
//! spawns it with the right environment, and performs the one-time MCP
//! handshake before any tool call is allowed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, ChildStderr, Command};

use crate::config::{AuthMode, BcConfig};

use super::errors::McpError;
use super::transport::{extract_result, StdioTransport};
use super::types::InitializeResult;

// ─── Constants ───────────────────────────────────────────────────────────────

/// MCP protocol version declared during the handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Registry package spawned via npx when no local build is configured.
const REGISTRY_PACKAGE: &str = "@knowall-ai/mcp-business-central";

/// Default location of a locally built server, relative to the working
/// directory, when `BC_LOCAL_SERVER_PATH` is unset.
const DEFAULT_LOCAL_SERVER: &str = "mcp-business-central-local/build/index.js";

/// How long to wait for stderr output when capturing diagnostics on failure.
const STDERR_CAPTURE_TIMEOUT: Duration = Duration::from_millis(500);

/// Truncation limit for captured stderr, keeps error messages readable.
const STDERR_CAPTURE_LIMIT: usize = 2000;

// ─── Command Resolution ──────────────────────────────────────────────────────

/// Resolve the server command for the configured auth mode.
///
/// - `azure_cli`: the published registry package via `npx`. The package's
///   published build only supports Azure CLI authentication, so this is the
///   only mode allowed to use it.
/// - `client_credentials`: a locally built server is required
///   (`BC_LOCAL_SERVER_PATH` or the default build location). A missing build
///   is a configuration error, never a silent fallback to the registry
///   package.
pub fn resolve_server_command(config: &BcConfig) -> Result<(String, Vec<String>), McpError> {
    match config.auth {
        AuthMode::AzureCli => Ok((
            "npx".to_string(),
            vec!["-y".to_string(), REGISTRY_PACKAGE.to_string()],
        )),
        AuthMode::ClientCredentials => {
            let server_path = config
                .local_server_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_SERVER));

            if !server_path.exists() {
                return Err(McpError::ConfigError {
                    reason: format!(
                        "client_credentials requires a locally built server; \
                         not found at {} (set BC_LOCAL_SERVER_PATH)",
                        server_path.display()
                    ),
                });
            }

            Ok((
                "node".to_string(),
                vec![server_path.to_string_lossy().into_owned()],
            ))
        }
    }
}

/// Build the environment passed to the server subprocess.
pub fn server_env(config: &BcConfig) -> HashMap<String, String> {
    let mut env = HashMap::from([
        ("BC_URL_SERVER".to_string(), config.url.clone()),
        ("BC_COMPANY".to_string(), config.company.clone()),
        ("BC_AUTH_TYPE".to_string(), config.auth.as_str().to_string()),
    ]);

    if config.auth == AuthMode::ClientCredentials {
        // Presence of the full triple is enforced at config load time.
        if let Some(ref id) = config.client_id {
            env.insert("BC_CLIENT_ID".to_string(), id.clone());
        }
        if let Some(ref secret) = config.client_secret {
            env.insert("BC_CLIENT_SECRET".to_string(), secret.clone());
        }
        if let Some(ref tenant) = config.tenant_id {
            env.insert("BC_TENANT_ID".to_string(), tenant.clone());
        }
    }

    env
}

// ─── Spawning ────────────────────────────────────────────────────────────────

/// A spawned server process with its transport and captured stderr.
pub struct SpawnedServer {
    pub process: Child,
    pub transport: StdioTransport,
    pub stderr: Option<ChildStderr>,
}

/// Spawn the Business Central MCP server subprocess.
///
/// Wires stdio for JSON-RPC and returns the raw channel — callers
/// must run [`initialize`] before issuing tool calls.
pub fn spawn_server(config: &BcConfig) -> Result<SpawnedServer, McpError> {
    let (command, args) = resolve_server_command(config)?;

    tracing::info!(command = %command, args = ?args, "starting Business Central MCP server");

    let mut cmd = Command::new(&command);
    cmd.args(&args);
    cmd.envs(server_env(config));
    cmd.stdin(std::process::Stdio::piped());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
        reason: format!("{command}: {e}"),
    })?;

    let stdin = child.stdin.take().ok_or(McpError::SpawnFailed {
        reason: "failed to capture stdin".into(),
    })?;
    let stdout = child.stdout.take().ok_or(McpError::SpawnFailed {
        reason: "failed to capture stdout".into(),
    })?;
    let stderr = child.stderr.take();

    Ok(SpawnedServer {
        process: child,
        transport: StdioTransport::new(stdin, stdout),
        stderr,
    })
}

// ─── Handshake ───────────────────────────────────────────────────────────────

/// Perform the MCP initialization handshake.
///
/// Must be the first call after the subprocess starts. Sends `initialize`
/// with the declared protocol version and client identity, then attempts the
/// `notifications/initialized` notification. Some server builds do not
/// support the notification, so its failure is non-fatal.
pub async fn initialize<W, R>(
    transport: &StdioTransport<W, R>,
) -> Result<InitializeResult, McpError>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    let params = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    });

    let response = transport.request("initialize", Some(params)).await?;
    let result = extract_result(response)?;

    let init: InitializeResult =
        serde_json::from_value(result).map_err(|e| McpError::InitFailed {
            reason: format!("failed to parse initialize response: {e}"),
        })?;

    tracing::info!(
        protocol = init.protocol_version.as_deref().unwrap_or("unknown"),
        server = init
            .server_info
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("unknown"),
        "MCP session initialized"
    );

    if let Err(e) = transport.notify("notifications/initialized", None).await {
        tracing::debug!(error = %e, "notifications/initialized not delivered (optional)");
    }

    Ok(init)
}

// ─── Diagnostics ─────────────────────────────────────────────────────────────

/// Read any available stderr output from a failed server process.
///
/// Uses a short timeout to avoid blocking when stderr is empty or the process
/// is still writing.
pub async fn read_stderr_tail(stderr: Option<ChildStderr>) -> String {
    use tokio::io::AsyncReadExt;

    let Some(mut stderr) = stderr else {
        return String::new();
    };

    let mut buf = String::new();
    match tokio::time::timeout(STDERR_CAPTURE_TIMEOUT, stderr.read_to_string(&mut buf)).await {
        Ok(Ok(_)) => {
            if buf.len() > STDERR_CAPTURE_LIMIT {
                buf.truncate(STDERR_CAPTURE_LIMIT);
                buf.push_str("...(truncated)");
            }
            buf
        }
        _ => String::new(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
