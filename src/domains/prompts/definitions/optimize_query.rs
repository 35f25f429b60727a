//! Query optimization prompt definition.

use super::{PromptDefinition, argument};
use rmcp::model::PromptArgument;

pub struct OptimizeQueryPrompt;

impl PromptDefinition for OptimizeQueryPrompt {
    const NAME: &'static str = "optimize_query";
    const DESCRIPTION: &'static str = "Review a BigQuery query for cost and performance";

    fn template() -> &'static str {
        r#"Review this BigQuery query for cost and performance:

```sql
{{query}}
```

Consider partition and cluster pruning, selected columns, join order and repeated subqueries.
{{#if goal}}
The main goal is: {{goal}}
{{/if}}
Propose a rewritten query and explain each change."#
    }

    fn arguments() -> Vec<PromptArgument> {
        vec![
            argument("query", "The SQL to review", true),
            argument("goal", "What to optimize for, e.g. bytes scanned", false),
        ]
    }
}
