//! Dataset exploration prompt definition.

use super::{PromptDefinition, argument};
use rmcp::model::PromptArgument;

/// Walks the model through the tables of one dataset.
pub struct ExploreDatasetPrompt;

impl PromptDefinition for ExploreDatasetPrompt {
    const NAME: &'static str = "explore_dataset";
    const DESCRIPTION: &'static str = "Explore the tables and schemas of a BigQuery dataset";

    fn template() -> &'static str {
        r#"Explore the BigQuery dataset `{{dataset_id}}`.

1. Call `bigquery_list_tables` with dataset_id "{{dataset_id}}".
2. For each table, call `bigquery_describe_table` to read its schema.
3. Summarize what each table contains and how the tables relate to each other.
{{#if focus}}
Pay particular attention to: {{focus}}
{{/if}}"#
    }

    fn arguments() -> Vec<PromptArgument> {
        vec![
            argument("dataset_id", "The dataset to explore", true),
            argument("focus", "Topic or column family to focus on", false),
        ]
    }
}
