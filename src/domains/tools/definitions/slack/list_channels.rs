//! Channel listing tool.

use std::sync::Arc;

use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::super::common::clamp_limit;
use crate::core::cancellation::CancellationToken;
use crate::domains::clients::MessagingClient;
use crate::domains::tools::{ToolArguments, ToolError, ToolHandler, json_content};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListChannelsParams {
    /// Maximum number of channels to return (default 100, max 200).
    #[serde(default)]
    pub limit: Option<u32>,
}

pub struct SlackListChannelsTool {
    client: Arc<dyn MessagingClient>,
}

impl SlackListChannelsTool {
    pub const NAME: &'static str = "slack_list_channels";

    pub const DESCRIPTION: &'static str = "List public channels in the Slack workspace.";

    pub fn new(client: Arc<dyn MessagingClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<ListChannelsParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for SlackListChannelsTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let params: ListChannelsParams = ToolArguments::new(arguments).parse()?;
        let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
        let channels = self.client.list_channels(limit).await?;
        json_content(&json!({ "channels": channels }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::stub::StubSlack;
    use super::*;

    #[tokio::test]
    async fn test_default_limit() {
        let stub = Arc::new(StubSlack::default());
        let tool = SlackListChannelsTool::new(stub.clone());
        let content = tool
            .call(&JsonObject::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*stub.last_limit.lock(), Some(DEFAULT_LIMIT));
        let text = serde_json::to_value(&content[0]).unwrap()["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("\"general\""));
    }
}
