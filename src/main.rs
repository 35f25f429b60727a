//! MCP Server Entry Point
//!
//! Parses the command line, loads configuration, initializes logging and
//! starts the selected service on the selected transport. Any failure before
//! or while serving is logged to stderr and ends the process with status 1.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use api_tools_mcp_server::core::config::DEFAULT_LOG_LEVEL;
use api_tools_mcp_server::core::{Config, McpServer, ServiceKind, TransportService};

/// MCP server exposing an upstream API as tools.
#[derive(Debug, Parser)]
#[command(name = "api-tools-mcp-server", version, about)]
struct Args {
    /// Upstream service to expose.
    #[arg(long, value_enum, env = "MCP_SERVICE")]
    service: Option<ServiceKind>,

    /// Serve over HTTP Server-Sent Events instead of stdin/stdout.
    #[arg(long)]
    sse: bool,

    /// Port for the SSE listener.
    #[arg(long)]
    port: Option<u16>,

    /// Host address for the SSE listener.
    #[arg(long)]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "MCP_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before parsing so `.env` can feed clap's `env` fallbacks.
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Logging starts before the rest of the config so its warnings are kept.
    init_logging(startup_log_level(&args));

    let mut config = Config::from_env();
    if let Some(service) = args.service {
        config = config.with_service(service);
    }
    if let Some(level) = args.log_level.clone() {
        config = config.with_log_level(level);
    }

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, mut config: Config) -> Result<()> {
    if args.sse || !config.transport.is_stdio() {
        config.transport = config
            .transport
            .clone()
            .into_sse(args.port, args.host)
            .context("Invalid transport configuration")?;
    } else if args.port.is_some() || args.host.is_some() {
        warn!("--port and --host only apply with --sse; ignoring");
    }

    info!(
        "Starting {} v{} ({} service)",
        config.server_name(),
        config.server.version,
        config.service
    );

    let transport = TransportService::new(config.transport.clone());
    let server = McpServer::from_config(config)?;

    transport.run(server).await?;

    info!("Server shutting down");
    Ok(())
}

/// `--log-level`, else `MCP_LOG_LEVEL` (both read by clap), else `info`.
fn startup_log_level(args: &Args) -> &str {
    args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
}

/// Initialize the logging subsystem.
///
/// Everything goes to stderr; stdout belongs to the protocol in STDIO mode.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
