//! Tool definitions module.
//!
//! One directory per upstream service, one file per tool. Each service
//! module exposes a `register` function that adds its tools to a
//! [`ToolRegistry`](super::ToolRegistry) against a shared client.

pub mod bigquery;
mod common;
pub mod confluence;
pub mod fetch;
pub mod slack;

pub use bigquery::{
    BigQueryDescribeTableTool, BigQueryExecuteQueryTool, BigQueryListDatasetsTool,
    BigQueryListTablesTool,
};
pub use confluence::{ConfluenceGetPageTool, ConfluenceSearchTool};
pub use fetch::{FetchParams, FetchTool};
pub use slack::{SlackChannelHistoryTool, SlackListChannelsTool, SlackUserProfileTool};
