//! Prompt service implementation.
//!
//! Holds the prompts of one service in listing order and renders them on
//! request.

use std::collections::HashMap;

use rmcp::model::{GetPromptResult, Prompt, PromptMessage, PromptMessageRole};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::error::PromptError;
use super::registry::prompts_for;
use super::templates::PromptTemplate;
use crate::core::config::ServiceKind;

/// Service for listing and instantiating prompts.
#[derive(Debug, Clone)]
pub struct PromptService {
    prompts: Vec<PromptTemplate>,
}

impl PromptService {
    pub fn new(prompts: Vec<PromptTemplate>) -> Self {
        Self { prompts }
    }

    /// The prompts for `service`, or `None` when it declares none.
    pub fn for_service(service: ServiceKind) -> Option<Self> {
        let prompts = prompts_for(service);
        if prompts.is_empty() {
            return None;
        }
        info!("Registered {} prompts", prompts.len());
        Some(Self::new(prompts))
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// List all available prompts.
    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts
            .iter()
            .map(|template| Prompt {
                name: template.name.clone(),
                title: None,
                description: template.description.clone(),
                arguments: Some(template.arguments.clone()),
                icons: None,
                meta: None,
            })
            .collect()
    }

    /// Get a prompt with arguments substituted.
    pub fn get_prompt(
        &self,
        name: &str,
        arguments: Option<&Map<String, Value>>,
    ) -> Result<GetPromptResult, PromptError> {
        let template = self
            .prompts
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PromptError::not_found(name))?;

        let arguments = string_arguments(arguments);
        template.check_required(&arguments)?;
        let content = template.render(&arguments)?;

        Ok(GetPromptResult {
            description: template.description.clone(),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, content)],
        })
    }

    /// Like [`get_prompt`](Self::get_prompt), but a failure is rendered as a
    /// single user message `Error: <message>` instead of an error.
    pub fn get_prompt_or_error(
        &self,
        name: &str,
        arguments: Option<&Map<String, Value>>,
    ) -> GetPromptResult {
        self.get_prompt(name, arguments).unwrap_or_else(|e| {
            warn!(prompt = name, "Prompt rendering failed: {}", e);
            GetPromptResult {
                description: None,
                messages: vec![PromptMessage::new_text(
                    PromptMessageRole::User,
                    format!("Error: {e}"),
                )],
            }
        })
    }
}

/// Prompt arguments arrive as JSON; strings are used as-is, null is dropped,
/// everything else is rendered in its JSON form.
fn string_arguments(arguments: Option<&Map<String, Value>>) -> HashMap<String, String> {
    arguments
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key.clone(), s.clone())),
            other => Some((key.clone(), other.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> PromptService {
        PromptService::for_service(ServiceKind::BigQuery).unwrap()
    }

    fn message_text(result: &GetPromptResult) -> String {
        let value = serde_json::to_value(&result.messages[0]).unwrap();
        assert_eq!(value["role"], json!("user"));
        value["content"]["text"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_services_without_prompts() {
        assert!(PromptService::for_service(ServiceKind::Fetch).is_none());
    }

    #[test]
    fn test_list_keeps_order() {
        let names: Vec<_> = service()
            .list_prompts()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["write_query", "explore_dataset", "optimize_query"]);
    }

    #[test]
    fn test_get_prompt_renders_arguments() {
        let args = json!({"question": "How many orders last week?", "dataset_id": "sales"});
        let result = service()
            .get_prompt("write_query", args.as_object())
            .unwrap();
        assert_eq!(result.messages.len(), 1);
        let text = message_text(&result);
        assert!(text.contains("How many orders last week?"));
        assert!(text.contains("`sales` dataset"));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn test_missing_required_argument() {
        let err = service().get_prompt("write_query", None).unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: question");
    }

    #[test]
    fn test_errors_become_messages() {
        let service = service();

        let result = service.get_prompt_or_error("nonexistent", None);
        assert_eq!(message_text(&result), "Error: Prompt not found: nonexistent");

        let result = service.get_prompt_or_error("explore_dataset", None);
        assert_eq!(
            message_text(&result),
            "Error: Missing required argument: dataset_id"
        );
    }

    #[test]
    fn test_non_string_arguments() {
        let args = json!({"a": 3, "b": null, "c": "x"});
        let converted = string_arguments(args.as_object());
        assert_eq!(converted.get("a").map(String::as_str), Some("3"));
        assert!(!converted.contains_key("b"));
        assert_eq!(converted.get("c").map(String::as_str), Some("x"));
    }
}
