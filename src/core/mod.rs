//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP server:
//! configuration, error handling, the protocol state machine, per-request
//! cancellation and the transport layer.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;

pub use cancellation::{CancelSubscription, CancellationToken, Cancelled, with_cancellation};
pub use config::{Config, ServiceCredentials, ServiceKind};
pub use error::{Error, Result};
pub use server::McpServer;
pub use transport::{Session, TransportConfig, TransportService};
