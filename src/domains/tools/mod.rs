//! Tools domain module.
//!
//! Tools are the callable operations a service exposes. Each one is a
//! [`ToolHandler`] registered in a [`ToolRegistry`]; the [`Dispatcher`]
//! routes `tools/call` requests to them and normalizes the outcome.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations, grouped by service
//! - `router.rs` - Builds the registry for the configured service
//! - `registry.rs` - Name-indexed tool catalog
//! - `dispatcher.rs` - Request routing and outcome normalization
//! - `handlers.rs` - Handler trait and invocation envelope
//! - `error.rs` - Tool-specific error types

pub mod definitions;
mod dispatcher;
mod error;
mod handlers;
mod registry;
pub mod router;

#[cfg(test)]
pub mod testing;

pub use dispatcher::Dispatcher;
pub use error::ToolError;
pub use handlers::*;
pub use registry::ToolRegistry;
pub use router::build_tool_registry;
