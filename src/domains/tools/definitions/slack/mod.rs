//! Slack tools.

mod channel_history;
mod list_channels;
mod user_profile;

use std::sync::Arc;

use crate::domains::clients::MessagingClient;
use crate::domains::tools::{ToolError, ToolRegistry};

pub use channel_history::{ChannelHistoryParams, SlackChannelHistoryTool};
pub use list_channels::{ListChannelsParams, SlackListChannelsTool};
pub use user_profile::{SlackUserProfileTool, UserProfileParams};

/// Register every Slack tool against one client.
pub fn register(registry: &mut ToolRegistry, client: Arc<dyn MessagingClient>) -> Result<(), ToolError> {
    registry.register(Arc::new(SlackListChannelsTool::new(client.clone())))?;
    registry.register(Arc::new(SlackChannelHistoryTool::new(client.clone())))?;
    registry.register(Arc::new(SlackUserProfileTool::new(client)))?;
    Ok(())
}
