//! Tool registry - the immutable catalog of one service's tools.
//!
//! Built once at startup by [`build_tool_registry`](super::build_tool_registry)
//! and shared read-only for the rest of the process. Lookup by name is
//! resolved here so the dispatcher never scans the catalog.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::Tool;

use super::error::ToolError;
use super::handlers::ToolHandler;

/// Name-indexed set of tool handlers in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: Vec<Arc<dyn ToolHandler>>,
    descriptors: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A second tool with the same name is rejected.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), ToolError> {
        let descriptor = handler.descriptor();
        let name = descriptor.name.to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }

        self.index.insert(name, self.handlers.len());
        self.handlers.push(handler);
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, handler: impl ToolHandler + 'static) -> Result<Self, ToolError> {
        self.register(Arc::new(handler))?;
        Ok(self)
    }

    /// Every descriptor, in registration order.
    pub fn list(&self) -> Vec<Tool> {
        self.descriptors.clone()
    }

    /// Look up a handler by tool name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.index.get(name).map(|&i| &self.handlers[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|t| t.name.as_ref()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
