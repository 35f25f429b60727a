//! Table schema tool.

use std::sync::Arc;

use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::cancellation::CancellationToken;
use crate::domains::clients::WarehouseClient;
use crate::domains::tools::{ToolArguments, ToolError, ToolHandler, json_content};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableParams {
    /// Dataset containing the table.
    pub dataset_id: String,

    /// Table to describe.
    pub table_id: String,
}

pub struct BigQueryDescribeTableTool {
    client: Arc<dyn WarehouseClient>,
}

impl BigQueryDescribeTableTool {
    pub const NAME: &'static str = "bigquery_describe_table";

    pub const DESCRIPTION: &'static str = "Get the schema, row count and description of a BigQuery table.";

    pub fn new(client: Arc<dyn WarehouseClient>) -> Self {
        Self { client }
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<DescribeTableParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for BigQueryDescribeTableTool {
    fn descriptor(&self) -> Tool {
        Self::to_tool()
    }

    async fn call(
        &self,
        arguments: &JsonObject,
        _cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError> {
        let args = ToolArguments::new(arguments);
        args.require_all(&["dataset_id", "table_id"])?;
        let params: DescribeTableParams = args.parse()?;
        let table = self
            .client
            .describe_table(&params.dataset_id, &params.table_id)
            .await?;
        json_content(&table)
    }
}
