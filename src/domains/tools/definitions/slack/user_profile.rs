//! User profile tool.

use std::sync::Arc;

use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::cancellation::CancellationToken;
use crate::domains::clients::MessagingClient;
use crate::domains::tools::{ToolArguments, ToolError, ToolHandler, json_content};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UserProfileParams {
    /// ID of the user, e.g. `U0123456789`.
    pub user_id: String,
}

pub struct SlackUserProfileTool {
    client: Arc<dyn MessagingClient>,
}

impl SlackUserProfileTool {
    pub const NAME: &'static str = "slack_get_user_profile";

    pub const DESCRIPTION: &'static str = "Get the profile of a Slack user.";

    pub fn new(client: Arc<dyn MessagingClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<UserProfileParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for SlackUserProfileTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let user_id = ToolArguments::new(arguments).require_str("user_id")?;
        let profile = self.client.user_profile(user_id).await?;
        json_content(&profile)
    }
}

#[cfg(test)]
mod tests {
    use super::super::stub::StubSlack;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_profile() {
        let tool = SlackUserProfileTool::new(Arc::new(StubSlack::default()));
        let args = json!({"user_id": "U1"}).as_object().cloned().unwrap();
        let content = tool.call(&args, &CancellationToken::new()).await.unwrap();
        let text = serde_json::to_value(&content[0]).unwrap()["text"]
            .as_str()
            .unwrap()
            .to_string();
        let body: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body["real_name"], json!("Ada"));
    }
}
