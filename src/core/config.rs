//! Configuration management for the MCP server.
//!
//! Configuration is read from the environment (after loading a `.env` file
//! when one exists). Command-line flags parsed in `main.rs` are applied on
//! top with the `with_*` methods.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which upstream API this process exposes as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Generic web page fetcher.
    Fetch,
    /// Google BigQuery data warehouse.
    #[value(name = "bigquery")]
    BigQuery,
    /// Slack messaging platform.
    Slack,
    /// Confluence documentation platform.
    Confluence,
}

impl ServiceKind {
    /// Lowercase identifier used on the command line and in env vars.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::BigQuery => "bigquery",
            Self::Slack => "slack",
            Self::Confluence => "confluence",
        }
    }

    /// Environment variables that must be set before this service starts.
    pub fn required_env(&self) -> &'static [&'static str] {
        match self {
            Self::Fetch => &[],
            Self::BigQuery => &[ENV_BIGQUERY_PROJECT_ID, ENV_BIGQUERY_ACCESS_TOKEN],
            Self::Slack => &[ENV_SLACK_BOT_TOKEN, ENV_SLACK_TEAM_ID],
            Self::Confluence => &[
                ENV_CONFLUENCE_BASE_URL,
                ENV_CONFLUENCE_EMAIL,
                ENV_CONFLUENCE_API_TOKEN,
            ],
        }
    }

    /// Parse an identifier as accepted by `--service` / `MCP_SERVICE`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "fetch" => Some(Self::Fetch),
            "bigquery" => Some(Self::BigQuery),
            "slack" => Some(Self::Slack),
            "confluence" => Some(Self::Confluence),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log level used when neither `--log-level` nor `MCP_LOG_LEVEL` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_BIGQUERY_PROJECT_ID: &str = "BIGQUERY_PROJECT_ID";
pub const ENV_BIGQUERY_ACCESS_TOKEN: &str = "BIGQUERY_ACCESS_TOKEN";
pub const ENV_SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const ENV_SLACK_TEAM_ID: &str = "SLACK_TEAM_ID";
pub const ENV_CONFLUENCE_BASE_URL: &str = "CONFLUENCE_BASE_URL";
pub const ENV_CONFLUENCE_EMAIL: &str = "CONFLUENCE_EMAIL";
pub const ENV_CONFLUENCE_API_TOKEN: &str = "CONFLUENCE_API_TOKEN";

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// The upstream API exposed by this process.
    pub service: ServiceKind,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Upstream API credentials.
    pub credentials: CredentialsConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name reported to clients; derived from the service when unset.
    pub name: Option<String>,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Credentials for every upstream API, as found in the environment.
///
/// Only the subset needed by the selected service is validated, see
/// [`CredentialsConfig::require`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub bigquery_project_id: Option<String>,
    pub bigquery_access_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_team_id: Option<String>,
    pub confluence_base_url: Option<String>,
    pub confluence_email: Option<String>,
    pub confluence_api_token: Option<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: &Option<String>) -> Option<&'static str> {
            value.as_ref().map(|_| "[REDACTED]")
        }

        f.debug_struct("CredentialsConfig")
            .field("bigquery_project_id", &self.bigquery_project_id)
            .field("bigquery_access_token", &redact(&self.bigquery_access_token))
            .field("slack_bot_token", &redact(&self.slack_bot_token))
            .field("slack_team_id", &self.slack_team_id)
            .field("confluence_base_url", &self.confluence_base_url)
            .field("confluence_email", &self.confluence_email)
            .field("confluence_api_token", &redact(&self.confluence_api_token))
            .finish()
    }
}

/// Validated credentials for one service.
#[derive(Clone)]
pub enum ServiceCredentials {
    Fetch,
    BigQuery {
        project_id: String,
        access_token: String,
    },
    Slack {
        bot_token: String,
        team_id: String,
    },
    Confluence {
        base_url: String,
        email: String,
        api_token: String,
    },
}

impl ServiceCredentials {
    pub fn service(&self) -> ServiceKind {
        match self {
            Self::Fetch => ServiceKind::Fetch,
            Self::BigQuery { .. } => ServiceKind::BigQuery,
            Self::Slack { .. } => ServiceKind::Slack,
            Self::Confluence { .. } => ServiceKind::Confluence,
        }
    }
}

impl CredentialsConfig {
    /// Read every known credential variable from the environment.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            bigquery_project_id: read(ENV_BIGQUERY_PROJECT_ID),
            bigquery_access_token: read(ENV_BIGQUERY_ACCESS_TOKEN),
            slack_bot_token: read(ENV_SLACK_BOT_TOKEN),
            slack_team_id: read(ENV_SLACK_TEAM_ID),
            confluence_base_url: read(ENV_CONFLUENCE_BASE_URL),
            confluence_email: read(ENV_CONFLUENCE_EMAIL),
            confluence_api_token: read(ENV_CONFLUENCE_API_TOKEN),
        }
    }

    /// Validate the credentials `service` needs.
    ///
    /// Fails with a configuration error naming every missing variable.
    pub fn require(&self, service: ServiceKind) -> Result<ServiceCredentials> {
        let lookup = |name: &str| -> Option<String> {
            match name {
                ENV_BIGQUERY_PROJECT_ID => self.bigquery_project_id.clone(),
                ENV_BIGQUERY_ACCESS_TOKEN => self.bigquery_access_token.clone(),
                ENV_SLACK_BOT_TOKEN => self.slack_bot_token.clone(),
                ENV_SLACK_TEAM_ID => self.slack_team_id.clone(),
                ENV_CONFLUENCE_BASE_URL => self.confluence_base_url.clone(),
                ENV_CONFLUENCE_EMAIL => self.confluence_email.clone(),
                ENV_CONFLUENCE_API_TOKEN => self.confluence_api_token.clone(),
                _ => None,
            }
        };

        let missing: Vec<&str> = service
            .required_env()
            .iter()
            .copied()
            .filter(|name| lookup(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!(
                "Missing required environment variable(s) for the {} service: {}",
                service,
                missing.join(", ")
            )));
        }

        let value = |name: &str| lookup(name).unwrap_or_default();
        Ok(match service {
            ServiceKind::Fetch => ServiceCredentials::Fetch,
            ServiceKind::BigQuery => ServiceCredentials::BigQuery {
                project_id: value(ENV_BIGQUERY_PROJECT_ID),
                access_token: value(ENV_BIGQUERY_ACCESS_TOKEN),
            },
            ServiceKind::Slack => ServiceCredentials::Slack {
                bot_token: value(ENV_SLACK_BOT_TOKEN),
                team_id: value(ENV_SLACK_TEAM_ID),
            },
            ServiceKind::Confluence => ServiceCredentials::Confluence {
                base_url: value(ENV_CONFLUENCE_BASE_URL),
                email: value(ENV_CONFLUENCE_EMAIL),
                api_token: value(ENV_CONFLUENCE_API_TOKEN),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            service: ServiceKind::Fetch,
            logging: LoggingConfig {
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
            transport: TransportConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Server settings are prefixed with `MCP_` (`MCP_SERVER_NAME`,
    /// `MCP_LOG_LEVEL`, `MCP_SERVICE`, `MCP_TRANSPORT`, ...). Credentials use
    /// the upstream-specific names listed in [`ServiceKind::required_env`].
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = Some(name);
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(service) = std::env::var("MCP_SERVICE") {
            match ServiceKind::parse(&service) {
                Some(kind) => config.service = kind,
                None => warn!("Ignoring unknown MCP_SERVICE value: {}", service),
            }
        }

        config.transport = TransportConfig::from_env();
        config.credentials = CredentialsConfig::from_env();

        config
    }

    /// Select the service to expose.
    pub fn with_service(mut self, service: ServiceKind) -> Self {
        self.service = service;
        self
    }

    /// Replace the transport configuration.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Override the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// Name reported to clients in `initialize`.
    pub fn server_name(&self) -> String {
        self.server
            .name
            .clone()
            .unwrap_or_else(|| format!("{}-mcp-server", self.service))
    }

    /// Validate the credentials of the selected service.
    pub fn service_credentials(&self) -> Result<ServiceCredentials> {
        self.credentials.require(self.service)
    }
}
