//! Content search tool.

use std::sync::Arc;

use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::super::common::clamp_limit;
use crate::core::cancellation::CancellationToken;
use crate::domains::clients::DocsClient;
use crate::domains::tools::{ToolArguments, ToolError, ToolHandler, json_content};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 50;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Search text, or a CQL expression such as `space = ENG AND type = page`.
    pub query: String,

    /// Maximum number of results (default 10, max 50).
    #[serde(default)]
    pub limit: Option<u32>,
}

pub struct ConfluenceSearchTool {
    client: Arc<dyn DocsClient>,
}

impl ConfluenceSearchTool {
    pub const NAME: &'static str = "confluence_search";

    pub const DESCRIPTION: &'static str = "Search Confluence content using plain text or CQL.";

    pub fn new(client: Arc<dyn DocsClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<SearchParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for ConfluenceSearchTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let args = ToolArguments::new(arguments);
        args.require("query")?;
        let params: SearchParams = args.parse()?;
        let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);

        let results = self.client.search(&params.query, limit).await?;
        info!("Search returned {} results", results.len());
        json_content(&json!({ "query": params.query, "results": results }))
    }
}
