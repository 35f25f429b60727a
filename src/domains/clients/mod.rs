//! Upstream API clients.
//!
//! Each service the server can front is reached through a narrow trait so
//! tool handlers can be tested against in-memory stubs. The `Http*` types
//! are the `reqwest` implementations used in production.

pub mod bigquery;
pub mod confluence;
mod error;
pub mod fetch;
pub mod slack;

pub use bigquery::{HttpWarehouseClient, WarehouseClient};
pub use confluence::{DocsClient, HttpDocsClient};
pub use error::{ApiError, ApiResult};
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use slack::{HttpMessagingClient, MessagingClient};
