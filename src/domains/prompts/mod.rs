//! Prompts domain module.
//!
//! Prompts are template messages a service offers to guide how an agent
//! uses its tools. Only some services declare prompts; for the others the
//! `prompts/*` methods are not available.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual prompt definitions (one file per prompt)
//! - `registry.rs` - Which prompts each service declares
//! - `service.rs` - Prompt service for listing and rendering
//! - `templates.rs` - Template rendering engine

pub mod definitions;
mod error;
mod registry;
mod service;
pub mod templates;

pub use definitions::PromptDefinition;
pub use error::PromptError;
pub use registry::prompts_for;
pub use service::PromptService;
pub use templates::PromptTemplate;
