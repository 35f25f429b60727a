//! Transport configuration types.

use serde::{Deserialize, Serialize};

#[cfg(not(feature = "sse"))]
use super::TransportError;
use super::TransportResult;

/// Default port of the SSE transport.
pub const DEFAULT_SSE_PORT: u16 = 3000;

/// Transport configuration options. Exactly one is active per process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Standard input/output transport (default for MCP).
    #[cfg(feature = "stdio")]
    Stdio,

    /// HTTP Server-Sent Events push stream with a POST endpoint for inbound messages.
    #[cfg(feature = "sse")]
    Sse(SseConfig),
}

/// SSE transport configuration.
#[cfg(feature = "sse")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,
}

#[cfg(feature = "sse")]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[cfg(feature = "sse")]
fn default_cors() -> bool {
    true
}

impl Default for TransportConfig {
    fn default() -> Self {
        #[cfg(feature = "stdio")]
        {
            return Self::Stdio;
        }

        #[cfg(all(not(feature = "stdio"), feature = "sse"))]
        {
            return Self::Sse(SseConfig::default());
        }

        #[cfg(not(any(feature = "stdio", feature = "sse")))]
        {
            compile_error!("At least one transport feature must be enabled: stdio or sse");
        }
    }
}

#[cfg(feature = "sse")]
impl Default for SseConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSE_PORT,
            host: default_host(),
            enable_cors: default_cors(),
        }
    }
}

impl TransportConfig {
    /// Create a STDIO transport config.
    #[cfg(feature = "stdio")]
    pub fn stdio() -> Self {
        Self::Stdio
    }

    /// Create an SSE transport config.
    #[cfg(feature = "sse")]
    pub fn sse(port: u16, host: impl Into<String>) -> Self {
        Self::Sse(SseConfig {
            port,
            host: host.into(),
            ..Default::default()
        })
    }

    /// Switch to the SSE transport, keeping any SSE settings already loaded.
    ///
    /// `port` and `host` override the loaded values when given.
    pub fn into_sse(self, port: Option<u16>, host: Option<String>) -> TransportResult<Self> {
        #[cfg(feature = "sse")]
        {
            let mut cfg = match self {
                Self::Sse(cfg) => cfg,
                #[allow(unreachable_patterns)]
                _ => SseConfig::default(),
            };
            if let Some(port) = port {
                cfg.port = port;
            }
            if let Some(host) = host {
                cfg.host = host;
            }
            Ok(Self::Sse(cfg))
        }

        #[cfg(not(feature = "sse"))]
        {
            let _ = (self, port, host);
            Err(TransportError::init(
                "SSE transport requested but this build has no `sse` feature",
            ))
        }
    }

    /// Load transport config from environment variables.
    pub fn from_env() -> Self {
        let transport = std::env::var("MCP_TRANSPORT")
            .unwrap_or_default()
            .to_lowercase();

        match transport.as_str() {
            #[cfg(feature = "sse")]
            "sse" => {
                let port = std::env::var("MCP_SSE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_SSE_PORT);
                let host = std::env::var("MCP_SSE_HOST").unwrap_or_else(|_| default_host());
                let enable_cors = std::env::var("MCP_SSE_CORS")
                    .map(|v| v.to_lowercase() != "false" && v != "0")
                    .unwrap_or(true);
                Self::Sse(SseConfig {
                    port,
                    host,
                    enable_cors,
                })
            }
            _ => Self::default(),
        }
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => "STDIO (standard MCP mode)".to_string(),
            #[cfg(feature = "sse")]
            Self::Sse(cfg) => format!("SSE on {}:{} (GET /sse, POST /messages)", cfg.host, cfg.port),
        }
    }

    /// Check if this transport is the standard STDIO mode.
    pub fn is_stdio(&self) -> bool {
        #[cfg(feature = "stdio")]
        {
            matches!(self, Self::Stdio)
        }
        #[cfg(not(feature = "stdio"))]
        {
            false
        }
    }
}
