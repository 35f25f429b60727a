//! Slack Web API client.
//!
//! Every Slack method answers HTTP 200 and reports failure through the
//! `ok`/`error` pair in the body, so both layers are checked.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ApiError, ApiResult, check_status, decode_json, http_client};

const SERVICE: &str = "Slack";
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_members: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Narrow view of Slack used by the Slack tools.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn list_channels(&self, limit: u32) -> ApiResult<Vec<Channel>>;

    async fn channel_history(&self, channel_id: &str, limit: u32) -> ApiResult<Vec<Message>>;

    /// The raw `profile` object of a user.
    async fn user_profile(&self, user_id: &str) -> ApiResult<Value>;
}

/// [`MessagingClient`] authenticated with a bot token.
#[derive(Clone)]
pub struct HttpMessagingClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    team_id: String,
}

impl HttpMessagingClient {
    pub fn new(bot_token: impl Into<String>, team_id: impl Into<String>) -> ApiResult<Self> {
        Ok(Self {
            http: http_client(concat!("api-tools-mcp-server/", env!("CARGO_PKG_VERSION")))?,
            base_url: DEFAULT_BASE_URL.to_string(),
            bot_token: bot_token.into(),
            team_id: team_id.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, method))
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await?;
        let body: Value = decode_json(SERVICE, check_status(SERVICE, response).await?).await?;
        into_payload(body)
    }
}

impl std::fmt::Debug for HttpMessagingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMessagingClient")
            .field("base_url", &self.base_url)
            .field("team_id", &self.team_id)
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

/// Reject `ok: false` bodies, then decode the rest.
fn into_payload<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    if body.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        return Err(ApiError::api(SERVICE, error));
    }
    serde_json::from_value(body).map_err(|e| ApiError::decode(SERVICE, e.to_string()))
}

#[derive(Deserialize)]
struct ChannelsPayload {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Deserialize)]
struct HistoryPayload {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct ProfilePayload {
    #[serde(default)]
    profile: Value,
}

#[async_trait]
impl MessagingClient for HttpMessagingClient {
    async fn list_channels(&self, limit: u32) -> ApiResult<Vec<Channel>> {
        let payload: ChannelsPayload = self
            .call(
                "conversations.list",
                &[
                    ("types", "public_channel".to_string()),
                    ("exclude_archived", "true".to_string()),
                    ("limit", limit.to_string()),
                    ("team_id", self.team_id.clone()),
                ],
            )
            .await?;
        Ok(payload.channels)
    }

    async fn channel_history(&self, channel_id: &str, limit: u32) -> ApiResult<Vec<Message>> {
        let payload: HistoryPayload = self
            .call(
                "conversations.history",
                &[
                    ("channel", channel_id.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(payload.messages)
    }

    async fn user_profile(&self, user_id: &str) -> ApiResult<Value> {
        let payload: ProfilePayload = self
            .call(
                "users.profile.get",
                &[("user", user_id.to_string()), ("include_labels", "true".to_string())],
            )
            .await?;
        Ok(payload.profile)
    }
}
