//! Tool-specific error types.
//!
//! The `Display` text of each variant is exactly the message placed in the
//! failure envelope returned to the calling agent.

use thiserror::Error;

use crate::core::cancellation::Cancelled;
use crate::domains::clients::ApiError;

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The call carried no arguments object.
    #[error("No arguments provided")]
    NoArguments,

    /// The requested tool is not registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument is absent, null or empty.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// An argument is present but unusable.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// The request was cancelled before or during the upstream call.
    #[error("Request was cancelled")]
    Cancelled,

    /// The upstream API rejected the call or could not be reached.
    #[error("{0}")]
    Upstream(String),

    /// A second tool was registered under an existing name.
    #[error("Tool already registered: {0}")]
    Duplicate(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "missing argument" error.
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument(name.into())
    }

    /// Create a new "invalid argument" error.
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<Cancelled> for ToolError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<ApiError> for ToolError {
    fn from(err: ApiError) -> Self {
        Self::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_messages() {
        assert_eq!(ToolError::NoArguments.to_string(), "No arguments provided");
        assert_eq!(
            ToolError::UnknownTool("nope".into()).to_string(),
            "Unknown tool: nope"
        );
        assert_eq!(
            ToolError::missing_argument("query").to_string(),
            "Missing required argument: query"
        );
        assert_eq!(ToolError::from(Cancelled).to_string(), "Request was cancelled");
    }

    #[test]
    fn test_upstream_message_passes_through() {
        let err = ToolError::from(ApiError::api("Slack", "channel_not_found"));
        assert_eq!(err.to_string(), "Slack API error: channel_not_found");
    }
}
