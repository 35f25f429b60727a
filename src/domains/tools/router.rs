//! Tool Router - builds the registry for the configured service.
//!
//! The service's credentials decide which API client is constructed and
//! which tool definitions are registered against it.

use std::sync::Arc;

use tracing::debug;

use super::definitions::{self, FetchTool};
use super::registry::ToolRegistry;
use crate::core::config::ServiceCredentials;
use crate::domains::clients::{
    HttpDocsClient, HttpMessagingClient, HttpPageFetcher, HttpWarehouseClient,
};

/// Build the tool registry with every tool of one service.
pub fn build_tool_registry(credentials: &ServiceCredentials) -> crate::core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    match credentials {
        ServiceCredentials::Fetch => {
            registry.register(Arc::new(FetchTool::new(Arc::new(HttpPageFetcher::new()?))))?;
        }
        ServiceCredentials::BigQuery {
            project_id,
            access_token,
        } => {
            let client = HttpWarehouseClient::new(project_id, access_token)?;
            definitions::bigquery::register(&mut registry, Arc::new(client))?;
        }
        ServiceCredentials::Slack { bot_token, team_id } => {
            let client = HttpMessagingClient::new(bot_token, team_id)?;
            definitions::slack::register(&mut registry, Arc::new(client))?;
        }
        ServiceCredentials::Confluence {
            base_url,
            email,
            api_token,
        } => {
            let client = HttpDocsClient::new(base_url, email, api_token)?;
            definitions::confluence::register(&mut registry, Arc::new(client))?;
        }
    }

    debug!(service = %credentials.service(), tools = ?registry.tool_names(), "Tool registry built");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(credentials: ServiceCredentials) -> Vec<String> {
        build_tool_registry(&credentials)
            .unwrap()
            .tool_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_fetch_catalog() {
        assert_eq!(names(ServiceCredentials::Fetch), vec!["fetch"]);
    }

    #[test]
    fn test_bigquery_catalog() {
        let tools = names(ServiceCredentials::BigQuery {
            project_id: "proj".into(),
            access_token: "token".into(),
        });
        assert_eq!(
            tools,
            vec![
                "bigquery_execute_query",
                "bigquery_list_datasets",
                "bigquery_list_tables",
                "bigquery_describe_table"
            ]
        );
    }

    #[test]
    fn test_slack_and_confluence_catalogs() {
        let slack = names(ServiceCredentials::Slack {
            bot_token: "xoxb".into(),
            team_id: "T1".into(),
        });
        assert_eq!(
            slack,
            vec![
                "slack_list_channels",
                "slack_get_channel_history",
                "slack_get_user_profile"
            ]
        );

        let confluence = names(ServiceCredentials::Confluence {
            base_url: "https://example.atlassian.net".into(),
            email: "me@example.com".into(),
            api_token: "tok".into(),
        });
        assert_eq!(confluence, vec!["confluence_search", "confluence_get_page"]);
    }

    #[test]
    fn test_every_schema_is_an_object() {
        let registry = build_tool_registry(&ServiceCredentials::BigQuery {
            project_id: "proj".into(),
            access_token: "token".into(),
        })
        .unwrap();
        for tool in registry.list() {
            assert_eq!(
                tool.input_schema.get("type"),
                Some(&serde_json::json!("object")),
                "{} schema",
                tool.name
            );
            assert!(tool.description.is_some());
        }
    }
}
