//! API tool servers over the Model Context Protocol.
//!
//! One binary fronts one upstream service (a web fetcher, BigQuery, Slack or
//! Confluence) and exposes its operations as MCP tools over STDIO or
//! HTTP Server-Sent Events.
//!
//! # Architecture
//!
//! - **core**: configuration, errors, the JSON-RPC protocol state machine,
//!   per-request cancellation and the transports
//! - **domains**: business logic organized by bounded contexts
//!   - **clients**: upstream API clients behind narrow traits
//!   - **tools**: tool handlers, registry and dispatcher
//!   - **prompts**: prompt templates declared by some services
//!
//! # Example
//!
//! ```rust,no_run
//! use api_tools_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let transport = TransportService::new(config.transport.clone());
//!     let server = McpServer::from_config(config)?;
//!     transport.run(server).await?;
//!     Ok(())
//! }
//! ```

#[cfg(not(any(feature = "stdio", feature = "sse")))]
compile_error!("enable at least one transport feature: `stdio` or `sse`");

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
