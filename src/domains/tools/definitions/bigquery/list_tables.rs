//! Table listing tool.

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
use crate::domains::tools::{ToolArguments, ToolError, ToolHandler, json_content};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTablesParams {
    /// Dataset whose tables to list.
    pub dataset_id: String,
}

pub struct BigQueryListTablesTool {
    client: Arc<dyn WarehouseClient>,
}

impl BigQueryListTablesTool {
    pub const NAME: &'static str = "bigquery_list_tables";

    pub const DESCRIPTION: &'static str = "List the tables in a BigQuery dataset.";

    pub fn new(client: Arc<dyn WarehouseClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<ListTablesParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for BigQueryListTablesTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let dataset_id = ToolArguments::new(arguments).require_str("dataset_id")?;
        let tables = self.client.list_tables(dataset_id).await?;
        info!(dataset_id, "Found {} tables", tables.len());
        json_content(&json!({ "datasetId": dataset_id, "tables": tables }))
    }
}
