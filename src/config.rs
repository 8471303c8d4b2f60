//! Environment-sourced configuration.
//!
//! All settings come from the process environment (typically exported from a
//! `.env` file by the deployment wrapper). Missing required values are fatal
//! at startup — there is no partial configuration.

use std::path::PathBuf;

use thiserror::Error;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default hosted model when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default HTTP listen port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8000;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    #[error("missing required environment variable: {name}")]
    Missing { name: &'static str },

    /// An environment variable is present but carries an unusable value.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// ─── Auth Mode ───────────────────────────────────────────────────────────────

/// How the spawned MCP server authenticates against Business Central.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Delegate to an existing `az login` session.
    AzureCli,
    /// App registration with client id/secret/tenant id.
    ClientCredentials,
}

impl AuthMode {
    /// The value passed to the server via `BC_AUTH_TYPE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::AzureCli => "azure_cli",
            AuthMode::ClientCredentials => "client_credentials",
        }
    }
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "azure_cli" => Ok(AuthMode::AzureCli),
            "client_credentials" => Ok(AuthMode::ClientCredentials),
            other => Err(format!(
                "expected 'azure_cli' or 'client_credentials', got '{other}'"
            )),
        }
    }
}

// ─── Business Central Config ─────────────────────────────────────────────────

/// Configuration for the Business Central MCP server subprocess.
#[derive(Debug, Clone)]
pub struct BcConfig {
    /// Business Central API base URL, e.g.
    /// `https://api.businesscentral.dynamics.com/v2.0/{tenant}/{env}/api/v2.0`.
    pub url: String,
    /// Company name in Business Central (the `name` field, not `displayName`).
    pub company: String,
    /// Authentication mode for the spawned server.
    pub auth: AuthMode,
    /// App registration credentials (required for `client_credentials`).
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    /// Optional path to a locally built server entry point
    /// (e.g. `./mcp-business-central-local/build/index.js`).
    pub local_server_path: Option<PathBuf>,
}

// ─── App Config ──────────────────────────────────────────────────────────────

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bc: BcConfig,
    /// Hosted model API key. When absent, `/chat` answers 503.
    pub openai_api_key: Option<String>,
    /// Hosted model name.
    pub model: String,
    /// HTTP listen port.
    pub port: u16,
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Keeps the parsing logic testable without mutating the process
    /// environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_nonempty = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let url = get_nonempty("BC_URL_SERVER").ok_or(ConfigError::Missing {
            name: "BC_URL_SERVER",
        })?;
        let company = get_nonempty("BC_COMPANY").ok_or(ConfigError::Missing {
            name: "BC_COMPANY",
        })?;

        let auth = match get_nonempty("BC_AUTH_TYPE") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: "BC_AUTH_TYPE",
                reason,
            })?,
            None => AuthMode::AzureCli,
        };

        let client_id = get_nonempty("BC_CLIENT_ID");
        let client_secret = get_nonempty("BC_CLIENT_SECRET");
        let tenant_id = get_nonempty("BC_TENANT_ID");

        // client_credentials requires the full app registration triple.
        if auth == AuthMode::ClientCredentials
            && (client_id.is_none() || client_secret.is_none() || tenant_id.is_none())
        {
            return Err(ConfigError::Invalid {
                name: "BC_AUTH_TYPE",
                reason: "client_credentials requires BC_CLIENT_ID, BC_CLIENT_SECRET \
                         and BC_TENANT_ID"
                    .into(),
            });
        }

        let port = match get_nonempty("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            bc: BcConfig {
                url,
                company,
                auth,
                client_id,
                client_secret,
                tenant_id,
                local_server_path: get_nonempty("BC_LOCAL_SERVER_PATH").map(PathBuf::from),
            },
            openai_api_key: get_nonempty("OPENAI_API_KEY"),
            model: get_nonempty("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
