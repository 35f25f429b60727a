//! Prompt Registry - which prompts each service declares.

use super::definitions::{
    ExploreDatasetPrompt, OptimizeQueryPrompt, PromptDefinition, WriteQueryPrompt,
};
use super::templates::PromptTemplate;
use crate::core::config::ServiceKind;

/// Build a PromptTemplate from a PromptDefinition.
fn build_template<P: PromptDefinition>() -> PromptTemplate {
    PromptTemplate {
        name: P::NAME.to_string(),
        description: Some(P::DESCRIPTION.to_string()),
        arguments: P::arguments(),
        template: P::template().to_string(),
    }
}

/// Prompts declared by `service`, in listing order. Empty when the service
/// has none.
pub fn prompts_for(service: ServiceKind) -> Vec<PromptTemplate> {
    match service {
        ServiceKind::BigQuery => vec![
            build_template::<WriteQueryPrompt>(),
            build_template::<ExploreDatasetPrompt>(),
            build_template::<OptimizeQueryPrompt>(),
        ],
        ServiceKind::Fetch | ServiceKind::Slack | ServiceKind::Confluence => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_bigquery_declares_prompts() {
        let names: Vec<_> = prompts_for(ServiceKind::BigQuery)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["write_query", "explore_dataset", "optimize_query"]);

        assert!(prompts_for(ServiceKind::Fetch).is_empty());
        assert!(prompts_for(ServiceKind::Slack).is_empty());
        assert!(prompts_for(ServiceKind::Confluence).is_empty());
    }

    #[test]
    fn test_first_argument_is_required() {
        for prompt in prompts_for(ServiceKind::BigQuery) {
            assert_eq!(prompt.arguments[0].required, Some(true), "{}", prompt.name);
            assert!(prompt.arguments[1..].iter().all(|a| a.required == Some(false)));
        }
    }
}
