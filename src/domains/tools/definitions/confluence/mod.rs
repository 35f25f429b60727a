//! Confluence tools.

mod get_page;
mod search;

use std::sync::Arc;

use crate::domains::clients::DocsClient;
use crate::domains::tools::{ToolError, ToolRegistry};

pub use get_page::{ConfluenceGetPageTool, GetPageParams, PageId};
pub use search::{ConfluenceSearchTool, SearchParams};

/// Register every Confluence tool against one client.
pub fn register(registry: &mut ToolRegistry, client: Arc<dyn DocsClient>) -> Result<(), ToolError> {
    registry.register(Arc::new(ConfluenceSearchTool::new(client.clone())))?;
    registry.register(Arc::new(ConfluenceGetPageTool::new(client)))?;
    Ok(())
}
