//! Query execution tool.
//!
//! Runs a Standard SQL query as a job and waits for its rows. If the request
//! is cancelled while the job runs, the job is cancelled upstream and the
//! wait is abandoned.

use std::sync::Arc;

use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::super::common::clamp_limit;
use crate::core::cancellation::{CancellationToken, with_cancellation};
use crate::domains::clients::WarehouseClient;
use crate::domains::tools::{ToolArguments, ToolError, ToolHandler, json_content};

const DEFAULT_MAX_RESULTS: u32 = 100;
const MAX_RESULTS_LIMIT: u32 = 10_000;

/// Parameters for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryParams {
    /// Standard SQL query to run.
    pub query: String,

    /// Maximum number of rows to return (default 100).
    #[serde(default)]
    pub max_results: Option<u32>,
}

pub struct BigQueryExecuteQueryTool {
    client: Arc<dyn WarehouseClient>,
}

impl BigQueryExecuteQueryTool {
    pub const NAME: &'static str = "bigquery_execute_query";

    pub const DESCRIPTION: &'static str = "Execute a SQL query against BigQuery and return the resulting rows as JSON. Uses Standard SQL.";

    pub fn new(client: Arc<dyn WarehouseClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<ExecuteQueryParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    #[instrument(skip_all)]
    async fn execute(
        &self,
        params: ExecuteQueryParams,
        cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        cancellation.ensure_active()?;

        let max_results = clamp_limit(params.max_results, DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT);
        let job = self.client.start_query(&params.query).await?;
        debug!(job_id = %job.job_id, "Waiting for query results");

        let client = self.client.clone();
        let cancel_job = job.clone();
        let results = with_cancellation(
            cancellation,
            move || client.request_cancel(&cancel_job),
            self.client.wait_for_results(&job, max_results),
        )
        .await??;

        info!(job_id = %job.job_id, rows = results.rows.len(), "Query complete");
        json_content(&results)
    }
}

#[async_trait::async_trait]
impl ToolHandler for BigQueryExecuteQueryTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let args = ToolArguments::new(arguments);
        args.require("query")?;
        self.execute(args.parse()?, cancellation).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::stub::StubWarehouse;
    use super::*;
    use serde_json::{Value, json};

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_missing_query() {
        let stub = Arc::new(StubWarehouse::default());
        let tool = BigQueryExecuteQueryTool::new(stub.clone());
        let err = tool
            .call(&args(json!({})), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: query");
        assert_eq!(stub.starts(), 0);
    }

    #[tokio::test]
    async fn test_returns_rows_as_json() {
        let stub = Arc::new(StubWarehouse::default());
        let tool = BigQueryExecuteQueryTool::new(stub.clone());
        let content = tool
            .call(
                &args(json!({"query": "select 1 as n", "max_results": 50000})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let text = serde_json::to_value(&content[0]).unwrap()["text"]
            .as_str()
            .unwrap()
            .to_string();
        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body["rows"], json!([{"n": "1"}]));
        assert_eq!(body["totalRows"], json!(1));
        assert_eq!(*stub.last_max_results.lock(), Some(MAX_RESULTS_LIMIT));
        assert_eq!(stub.last_query.lock().as_deref(), Some("select 1 as n"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_contacts_upstream() {
        let stub = Arc::new(StubWarehouse::default());
        let tool = BigQueryExecuteQueryTool::new(stub.clone());
        let token = CancellationToken::new();
        token.cancel();

        let err = tool
            .call(&args(json!({"query": "select 1"})), &token)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request was cancelled");
        assert_eq!(stub.starts(), 0);
        assert_eq!(stub.cancels(), 0);
    }

    #[tokio::test]
    async fn test_cancel_while_running_cancels_job_once() {
        let stub = Arc::new(StubWarehouse::hanging());
        let tool = Arc::new(BigQueryExecuteQueryTool::new(stub.clone()));
        let token = CancellationToken::new();

        let call = tokio::spawn({
            let tool = tool.clone();
            let token = token.clone();
            async move { tool.call(&args(json!({"query": "select 1"})), &token).await }
        });
        stub.waiting.notified().await;
        assert_eq!(token.listener_count(), 1);

        token.cancel();
        token.cancel();
        let err = call.await.unwrap().unwrap_err();

        assert!(matches!(err, ToolError::Cancelled));
        assert_eq!(stub.starts(), 1);
        assert_eq!(stub.cancels(), 1);
        assert_eq!(*stub.cancelled_jobs.lock(), vec!["job_0".to_string()]);
        assert_eq!(token.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_completion_deregisters_cancel_listener() {
        let stub = Arc::new(StubWarehouse::default());
        let tool = BigQueryExecuteQueryTool::new(stub.clone());
        let token = CancellationToken::new();

        tool.call(&args(json!({"query": "select 1"})), &token)
            .await
            .unwrap();
        assert_eq!(token.listener_count(), 0);

        token.cancel();
        assert_eq!(stub.cancels(), 0);
    }

    #[tokio::test]
    async fn test_job_failure_deregisters_cancel_listener() {
        let stub = Arc::new(StubWarehouse::failing("Syntax error: Unexpected end of script"));
        let tool = BigQueryExecuteQueryTool::new(stub.clone());
        let token = CancellationToken::new();

        let err = tool
            .call(&args(json!({"query": "select"})), &token)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "BigQuery API error: Syntax error: Unexpected end of script"
        );
        assert_eq!(stub.starts(), 1);
        assert_eq!(token.listener_count(), 0);

        token.cancel();
        assert_eq!(stub.cancels(), 0);
    }
}
