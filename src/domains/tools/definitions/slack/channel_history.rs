//! Channel history tool.

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

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChannelHistoryParams {
    /// ID of the channel, e.g. `C0123456789`.
    pub channel_id: String,

    /// Number of messages to retrieve (default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

pub struct SlackChannelHistoryTool {
    client: Arc<dyn MessagingClient>,
}

impl SlackChannelHistoryTool {
    pub const NAME: &'static str = "slack_get_channel_history";

    pub const DESCRIPTION: &'static str = "Get recent messages from a Slack channel.";

    pub fn new(client: Arc<dyn MessagingClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<ChannelHistoryParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for SlackChannelHistoryTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let args = ToolArguments::new(arguments);
        args.require("channel_id")?;
        let params: ChannelHistoryParams = args.parse()?;
        let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
        let messages = self.client.channel_history(&params.channel_id, limit).await?;
        json_content(&json!({ "channelId": params.channel_id, "messages": messages }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::stub::StubSlack;
    use super::*;

    fn args(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_history() {
        let stub = Arc::new(StubSlack::default());
        let tool = SlackChannelHistoryTool::new(stub.clone());
        let token = CancellationToken::new();

        let err = tool.call(&args(json!({"limit": 5})), &token).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: channel_id");

        let content = tool
            .call(&args(json!({"channel_id": "C1", "limit": 5})), &token)
            .await
            .unwrap();
        assert_eq!(*stub.last_limit.lock(), Some(5));
        let text = serde_json::to_value(&content[0]).unwrap()["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("\"hello\""));
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let tool = SlackChannelHistoryTool::new(Arc::new(StubSlack::default()));
        let err = tool
            .call(&args(json!({"channel_id": "C404"})), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Slack API error: channel_not_found");
    }
}
