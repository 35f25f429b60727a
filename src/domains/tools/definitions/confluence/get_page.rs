//! Page retrieval tool.

use std::sync::Arc;

use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::cancellation::CancellationToken;
use crate::domains::clients::DocsClient;
use crate::domains::tools::{ToolArguments, ToolError, ToolHandler, json_content};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetPageParams {
    /// Numeric ID of the page, as a string or an integer.
    pub page_id: PageId,
}

/// Page ids arrive either way depending on the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PageId {
    Number(u64),
    Text(String),
}

impl PageId {
    /// The id as Confluence spells it: ASCII digits only.
    pub fn to_digits(&self) -> Result<String, ToolError> {
        match self {
            Self::Number(n) => Ok(n.to_string()),
            Self::Text(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(s.clone())
            }
            Self::Text(_) => Err(ToolError::invalid_argument(
                "page_id",
                "expected a numeric page id",
            )),
        }
    }
}

pub struct ConfluenceGetPageTool {
    client: Arc<dyn DocsClient>,
}

impl ConfluenceGetPageTool {
    pub const NAME: &'static str = "confluence_get_page";

    pub const DESCRIPTION: &'static str = "Get a Confluence page by ID, including its storage-format body.";

    pub fn new(client: Arc<dyn DocsClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<GetPageParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for ConfluenceGetPageTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let args = ToolArguments::new(arguments);
        args.require("page_id")?;
        let params: GetPageParams = args.parse()?;
        let page_id = params.page_id.to_digits()?;
        let page = self.client.get_page(&page_id).await?;
        json_content(&page)
    }
}
