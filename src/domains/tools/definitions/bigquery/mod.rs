//! BigQuery tools.
//!
//! All four tools share one [`WarehouseClient`]; only query execution is
//! long-running, so it is the only one wired to cancellation.

mod describe_table;
mod execute_query;
mod list_datasets;
mod list_tables;

use std::sync::Arc;

use crate::domains::clients::WarehouseClient;
use crate::domains::tools::{ToolError, ToolRegistry};

pub use describe_table::{BigQueryDescribeTableTool, DescribeTableParams};
pub use execute_query::{BigQueryExecuteQueryTool, ExecuteQueryParams};
pub use list_datasets::{BigQueryListDatasetsTool, ListDatasetsParams};
pub use list_tables::{BigQueryListTablesTool, ListTablesParams};

/// Register every BigQuery tool against one client.
pub fn register(registry: &mut ToolRegistry, client: Arc<dyn WarehouseClient>) -> Result<(), ToolError> {
    registry.register(Arc::new(BigQueryExecuteQueryTool::new(client.clone())))?;
    registry.register(Arc::new(BigQueryListDatasetsTool::new(client.clone())))?;
    registry.register(Arc::new(BigQueryListTablesTool::new(client.clone())))?;
    registry.register(Arc::new(BigQueryDescribeTableTool::new(client)))?;
    Ok(())
}
