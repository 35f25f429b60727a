//! Prompt templates module.
//!
//! Templates use a small handlebars-like syntax:
//! - `{{variable}}` is replaced with the value of `variable`
//! - `{{#if variable}}content{{/if}}` includes content only if variable is set
//! - `{{#if variable}}content{{else}}alternative{{/if}}` with else support
//!
//! Blocks may nest. Placeholders without a value render as nothing.

use std::collections::HashMap;

use rmcp::model::PromptArgument;

use super::error::PromptError;

const IF_OPEN: &str = "{{#if ";
const ELSE: &str = "{{else}}";
const IF_CLOSE: &str = "{{/if}}";

/// A prompt template that can be instantiated with arguments.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The unique name of the prompt.
    pub name: String,

    /// A description of what the prompt does.
    pub description: Option<String>,

    /// The arguments that this prompt accepts.
    pub arguments: Vec<PromptArgument>,

    /// The template string with placeholders.
    pub template: String,
}

impl PromptTemplate {
    /// Create a new prompt template.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        arguments: Vec<PromptArgument>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            arguments,
            template: template.into(),
        }
    }

    /// Fail on the first required argument that is absent or empty.
    pub fn check_required(&self, arguments: &HashMap<String, String>) -> Result<(), PromptError> {
        for arg in &self.arguments {
            let present = arguments.get(&arg.name).is_some_and(|v| !v.trim().is_empty());
            if arg.required.unwrap_or(false) && !present {
                return Err(PromptError::missing_argument(&arg.name));
            }
        }
        Ok(())
    }

    /// Render the template with the given arguments.
    pub fn render(&self, arguments: &HashMap<String, String>) -> Result<String, PromptError> {
        let expanded = process_conditionals(&self.template, arguments)?;
        Ok(substitute(&expanded, arguments))
    }
}

fn is_set(arguments: &HashMap<String, String>, name: &str) -> bool {
    arguments.get(name).is_some_and(|v| !v.is_empty())
}

/// Resolve `{{#if}}` blocks innermost first.
fn process_conditionals(
    template: &str,
    arguments: &HashMap<String, String>,
) -> Result<String, PromptError> {
    let mut result = template.to_string();

    while let Some(close) = result.find(IF_CLOSE) {
        let open = result[..close]
            .rfind(IF_OPEN)
            .ok_or_else(|| PromptError::template("{{/if}} without matching {{#if}}"))?;
        let tag_end = result[open..close]
            .find("}}")
            .map(|i| open + i)
            .ok_or_else(|| PromptError::template("Unclosed {{#if}} tag"))?;

        let var_name = result[open + IF_OPEN.len()..tag_end].trim();
        if var_name.is_empty() {
            return Err(PromptError::template("{{#if}} without a variable name"));
        }

        let body = &result[tag_end + 2..close];
        let (when_set, otherwise) = match body.find(ELSE) {
            Some(i) => (&body[..i], &body[i + ELSE.len()..]),
            None => (body, ""),
        };
        let replacement = if is_set(arguments, var_name) {
            when_set
        } else {
            otherwise
        };

        result = format!(
            "{}{}{}",
            &result[..open],
            replacement,
            &result[close + IF_CLOSE.len()..]
        );
    }

    if result.contains(IF_OPEN) {
        return Err(PromptError::template("Missing {{/if}} tag"));
    }
    Ok(result)
}

/// Replace `{{name}}` placeholders in one pass, so argument values are never
/// themselves expanded.
fn substitute(template: &str, arguments: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = arguments.get(key) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn template(text: &str) -> PromptTemplate {
        PromptTemplate::new("test", None, vec![], text)
    }

    #[test]
    fn test_simple_substitution() {
        let rendered = template("Hello, {{name}}!")
            .render(&args(&[("name", "World")]))
            .unwrap();
        assert_eq!(rendered, "Hello, World!");
    }

    #[test]
    fn test_conditional_with_else() {
        let t = template("Hello, {{#if name}}{{name}}{{else}}stranger{{/if}}!");
        assert_eq!(t.render(&args(&[])).unwrap(), "Hello, stranger!");
        assert_eq!(t.render(&args(&[("name", "Ada")])).unwrap(), "Hello, Ada!");
    }

    #[test]
    fn test_nested_conditionals() {
        let t = template("{{#if a}}A{{#if b}}B{{else}}-{{/if}}{{/if}}.");
        assert_eq!(t.render(&args(&[("a", "1"), ("b", "1")])).unwrap(), "AB.");
        assert_eq!(t.render(&args(&[("a", "1")])).unwrap(), "A-.");
        assert_eq!(t.render(&args(&[("b", "1")])).unwrap(), ".");
    }

    #[test]
    fn test_values_are_not_expanded() {
        let rendered = template("Q: {{q}} {{missing}}")
            .render(&args(&[("q", "{{secret}}")]))
            .unwrap();
        assert_eq!(rendered, "Q: {{secret}} ");
    }

    #[test]
    fn test_malformed_blocks() {
        assert!(template("{{#if x}}open").render(&args(&[])).is_err());
        assert!(template("close{{/if}}").render(&args(&[])).is_err());
    }

    #[test]
    fn test_check_required() {
        let t = PromptTemplate::new(
            "t",
            None,
            vec![PromptArgument {
                name: "query".into(),
                title: None,
                description: None,
                required: Some(true),
            }],
            "{{query}}",
        );
        let err = t.check_required(&args(&[("query", " ")])).unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: query");
        assert!(t.check_required(&args(&[("query", "select 1")])).is_ok());
    }
}
