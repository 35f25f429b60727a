//! Transport layer for the MCP server.
//!
//! This module provides two interchangeable transports:
//! - **STDIO**: newline-delimited JSON-RPC on stdin/stdout (default) - feature: `stdio`
//! - **SSE**: `GET /sse` push stream plus `POST /messages` - feature: `sse`
//!
//! Both decode raw messages and hand them, together with their [`Session`],
//! to [`McpServer::handle_message`](crate::core::McpServer::handle_message).
//! Tool handling is identical whichever transport carries it.

mod config;
mod error;
mod service;
pub mod session;

#[cfg(feature = "sse")]
pub mod sse;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::{DEFAULT_SSE_PORT, TransportConfig};
pub use error::{TransportError, TransportResult};
pub use service::TransportService;
pub use session::{InFlightRequest, Session};

#[cfg(feature = "sse")]
pub use config::SseConfig;
