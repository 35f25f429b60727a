//! Dataset listing tool.

use std::sync::Arc;

use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::core::cancellation::CancellationToken;
use crate::domains::clients::WarehouseClient;
use crate::domains::tools::{ToolError, ToolHandler, json_content};

/// The tool takes no parameters.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListDatasetsParams {}

pub struct BigQueryListDatasetsTool {
    client: Arc<dyn WarehouseClient>,
}

impl BigQueryListDatasetsTool {
    pub const NAME: &'static str = "bigquery_list_datasets";

    pub const DESCRIPTION: &'static str = "List all datasets in the configured BigQuery project.";

    pub fn new(client: Arc<dyn WarehouseClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<ListDatasetsParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for BigQueryListDatasetsTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        _arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let datasets = self.client.list_datasets().await?;
        info!("Found {} datasets", datasets.len());
        json_content(&json!({ "datasets": datasets }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::stub::StubWarehouse;
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_lists_datasets() {
        let tool = BigQueryListDatasetsTool::new(Arc::new(StubWarehouse::default()));
        let content = tool
            .call(&JsonObject::new(), &CancellationToken::new())
            .await
            .unwrap();
        let text = serde_json::to_value(&content[0]).unwrap()["text"]
            .as_str()
            .unwrap()
            .to_string();
        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body["datasets"][0]["datasetId"], json!("sales"));
    }
}
