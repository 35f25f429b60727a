//! Query authoring prompt definition.

use super::{PromptDefinition, argument};
use rmcp::model::PromptArgument;

/// Turns a natural-language question into Standard SQL.
pub struct WriteQueryPrompt;

impl PromptDefinition for WriteQueryPrompt {
    const NAME: &'static str = "write_query";
    const DESCRIPTION: &'static str = "Write a BigQuery Standard SQL query that answers a question";

    fn template() -> &'static str {
        r#"Write a BigQuery Standard SQL query that answers the following question:

{{question}}

{{#if dataset_id}}
Use tables from the `{{dataset_id}}` dataset. Check their schemas with `bigquery_describe_table` before writing the query.
{{else}}
First find the relevant tables with `bigquery_list_datasets` and `bigquery_list_tables`.
{{/if}}
Run the query with `bigquery_execute_query` and explain the result."#
    }

    fn arguments() -> Vec<PromptArgument> {
        vec![
            argument("question", "The question to answer", true),
            argument("dataset_id", "Dataset to restrict the query to", false),
        ]
    }
}
