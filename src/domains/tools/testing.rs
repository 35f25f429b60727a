//! Test doubles shared by the tools, server and transport tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rmcp::model::{Content, JsonObject, Tool};
use tokio::sync::Notify;

use super::error::ToolError;
use super::handlers::ToolHandler;
use crate::core::cancellation::{CancellationToken, with_cancellation};

/// Descriptor with an open object schema.
pub fn descriptor(name: &'static str, description: &'static str) -> Tool {
    let mut schema = JsonObject::new();
    schema.insert("type".into(), "object".into());
    Tool {
        name: name.into(),
        title: None,
        description: Some(description.into()),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

/// Returns its arguments as one compact JSON text block.
pub struct EchoTool;

#[async_trait::async_trait]
impl ToolHandler for EchoTool {
    fn descriptor(&self) -> Tool {
        descriptor("echo", "Echo the arguments back")
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let text = serde_json::to_string(arguments)
            .map_err(|e| ToolError::internal(e.to_string()))?;
        Ok(vec![Content::text(text)])
    }
}

/// Never completes on its own; resolves only when its token is cancelled.
#[derive(Clone, Default)]
pub struct BlockingTool {
    started: Arc<Notify>,
    finished: Arc<Notify>,
    cancellations: Arc<AtomicUsize>,
}

impl BlockingTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a call has entered the handler.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Wait until a call has left the handler.
    pub async fn finished(&self) {
        self.finished.notified().await;
    }

    /// How many times the upstream cancel hook fired.
    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ToolHandler for BlockingTool {
    fn descriptor(&self) -> Tool {
        descriptor("block", "Block until cancelled")
    }

    async fn call(
        &self,
        _arguments: &JsonObject,
        cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let counter = self.cancellations.clone();
        let started = self.started.clone();
        let outcome = with_cancellation(
            cancellation,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            async move {
                started.notify_one();
                std::future::pending::<()>().await
            },
        )
        .await;
        self.finished.notify_one();
        outcome?;
        Ok(Vec::new())
    }
}
