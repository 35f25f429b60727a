//! Routes invocation requests to handlers and normalizes every outcome.
//!
//! Whatever happens inside a handler, including a panic, the caller gets an
//! [`InvocationResult`] back. Nothing a tool does can become a transport
//! error.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rmcp::model::Tool;
use tracing::{info, warn};

use super::error::ToolError;
use super::handlers::{InvocationRequest, InvocationResult};
use super::registry::ToolRegistry;
use crate::core::cancellation::CancellationToken;

/// Shared, clonable front of a [`ToolRegistry`].
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The catalog served by `tools/list`.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.registry.list()
    }

    /// Execute one request under its own cancellation token.
    pub async fn handle(
        &self,
        request: InvocationRequest,
        cancellation: &CancellationToken,
    ) -> InvocationResult {
        info!(tool = %request.tool_name, "Tool call received");

        match self.invoke(&request, cancellation).await {
            Ok(content) => InvocationResult::Success(content),
            Err(e) => {
                warn!(tool = %request.tool_name, "Tool call failed: {}", e);
                InvocationResult::Failure(e.to_string())
            }
        }
    }

    async fn invoke(
        &self,
        request: &InvocationRequest,
        cancellation: &CancellationToken,
    ) -> Result<Vec<rmcp::model::Content>, ToolError> {
        let Some(arguments) = request.arguments.as_ref() else {
            return Err(ToolError::NoArguments);
        };
        let handler = self
            .registry
            .get(&request.tool_name)
            .ok_or_else(|| ToolError::UnknownTool(request.tool_name.clone()))?;

        match AssertUnwindSafe(handler.call(arguments, cancellation))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(ToolError::internal(panic_message(panic.as_ref()))),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("tool panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("tool panicked: {s}")
    } else {
        "tool panicked".to_string()
    }
}
