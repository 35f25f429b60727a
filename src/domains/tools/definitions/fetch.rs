//! Fetch tool definition.
//!
//! Retrieves a web page and returns its body as text.

use std::sync::Arc;

use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument};

use super::common::truncate_chars;
use crate::core::cancellation::{CancellationToken, with_cancellation};
use crate::domains::clients::PageFetcher;
use crate::domains::tools::{ToolArguments, ToolError, ToolHandler, text_content};

/// Characters returned when the caller does not choose.
pub const DEFAULT_MAX_LENGTH: usize = 5000;

/// Parameters for the fetch tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute http(s) URL to fetch.
    pub url: String,

    /// Maximum number of characters to return (default 5000).
    #[serde(default)]
    pub max_length: Option<usize>,
}

/// Fetch tool - returns the body of a URL.
pub struct FetchTool {
    fetcher: Arc<dyn PageFetcher>,
}

impl FetchTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "fetch";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Fetch a URL from the internet and return its contents as text.";

    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<FetchParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    #[instrument(skip_all, fields(url = %params.url))]
    async fn execute(
        &self,
        params: FetchParams,
        cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let url = reqwest::Url::parse(&params.url)
            .map_err(|e| ToolError::invalid_argument("url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ToolError::invalid_argument(
                "url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        cancellation.ensure_active()?;
        // Dropping the request future aborts the HTTP exchange; nothing to signal upstream.
        let page = with_cancellation(cancellation, || {}, self.fetcher.fetch(&params.url)).await??;

        let max_length = params.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        let (body, truncated) = truncate_chars(&page.body, max_length);
        info!("Fetched {} characters", body.chars().count());

        let mut text = format!("Contents of {}:\n{}", params.url, body);
        if truncated {
            text.push_str(&format!(
                "\n\n<content truncated at {max_length} characters>"
            ));
        }
        Ok(text_content(text))
    }
}

#[async_trait::async_trait]
impl ToolHandler for FetchTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let args = ToolArguments::new(arguments);
        args.require("url")?;
        self.execute(args.parse()?, cancellation).await
    }
}
