//! Tool handler contract and the invocation envelope.
//!
//! Each tool is a [`ToolHandler`] value: it describes itself with a
//! [`Tool`] descriptor and executes calls against an upstream API client.
//! The [`Dispatcher`](super::Dispatcher) turns whatever a handler returns
//! into an [`InvocationResult`].

use rmcp::model::{CallToolRequestParam, CallToolResult, Content, JsonObject, Tool};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ToolError;
use crate::core::cancellation::CancellationToken;

/// Trait implemented by every tool.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Descriptor advertised in `tools/list`. Must be the same on every call.
    fn descriptor(&self) -> Tool;

    /// Execute the tool.
    ///
    /// Handlers validate their own required fields. Handlers whose upstream
    /// call can outlive the request must honor `cancellation`.
    async fn call(
        &self,
        arguments: &JsonObject,
        cancellation: &CancellationToken,
    ) -> Result<Vec<Content>, ToolError>;
}

/// One request to execute a tool.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub tool_name: String,
    /// `None` when the call had no arguments object.
    pub arguments: Option<JsonObject>,
}

impl InvocationRequest {
    /// Build a request from the raw `arguments` value of `tools/call`.
    ///
    /// Anything other than a JSON object counts as no arguments.
    pub fn new(tool_name: impl Into<String>, arguments: Option<Value>) -> Self {
        let arguments = match arguments {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        };
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn with_arguments(tool_name: impl Into<String>, arguments: JsonObject) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Some(arguments),
        }
    }
}

impl From<CallToolRequestParam> for InvocationRequest {
    fn from(params: CallToolRequestParam) -> Self {
        Self {
            tool_name: params.name.into_owned(),
            arguments: params.arguments,
        }
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone)]
pub enum InvocationResult {
    Success(Vec<Content>),
    Failure(String),
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure message, if this is a failure.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failure(message) => Some(message),
            Self::Success(_) => None,
        }
    }
}

impl From<InvocationResult> for CallToolResult {
    /// Failures become a single text block holding `{"error": message}`.
    fn from(result: InvocationResult) -> Self {
        match result {
            InvocationResult::Success(content) => CallToolResult::success(content),
            InvocationResult::Failure(message) => CallToolResult::error(vec![Content::text(
                serde_json::json!({ "error": message }).to_string(),
            )]),
        }
    }
}

/// Read-only view over a call's arguments with field-level validation.
#[derive(Debug, Clone, Copy)]
pub struct ToolArguments<'a> {
    inner: &'a JsonObject,
}

impl<'a> ToolArguments<'a> {
    pub fn new(inner: &'a JsonObject) -> Self {
        Self { inner }
    }

    /// Fail with `MissingArgument` unless `field` is present and non-empty.
    pub fn require(&self, field: &str) -> Result<&'a Value, ToolError> {
        match self.inner.get(field) {
            None | Some(Value::Null) => Err(ToolError::missing_argument(field)),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(ToolError::missing_argument(field))
            }
            Some(value) => Ok(value),
        }
    }

    /// Check every field in order, reporting the first one missing.
    pub fn require_all(&self, fields: &[&str]) -> Result<(), ToolError> {
        for field in fields {
            self.require(field)?;
        }
        Ok(())
    }

    /// A required string field.
    pub fn require_str(&self, field: &str) -> Result<&'a str, ToolError> {
        self.require(field)?
            .as_str()
            .ok_or_else(|| ToolError::invalid_argument(field, "expected a string"))
    }

    /// Deserialize the whole object into a parameters struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.inner.clone()))
            .map_err(|e| ToolError::invalid_argument("arguments", e.to_string()))
    }
}

/// Wrap plain text as the only content block.
pub fn text_content(text: impl Into<String>) -> Vec<Content> {
    vec![Content::text(text.into())]
}

/// Pretty-printed JSON as the only content block.
pub fn json_content(value: &impl serde::Serialize) -> Result<Vec<Content>, ToolError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ToolError::internal(format!("failed to encode result: {e}")))?;
    Ok(text_content(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_request_without_object_has_no_arguments() {
        assert!(InvocationRequest::new("t", None).arguments.is_none());
        assert!(InvocationRequest::new("t", Some(Value::Null)).arguments.is_none());
        assert!(InvocationRequest::new("t", Some(json!("x"))).arguments.is_none());
        assert!(InvocationRequest::new("t", Some(json!({}))).arguments.is_some());
    }

    #[test]
    fn test_request_from_call_params() {
        let params: CallToolRequestParam =
            serde_json::from_value(json!({"name": "echo", "arguments": null})).unwrap();
        let request = InvocationRequest::from(params);
        assert_eq!(request.tool_name, "echo");
        assert!(request.arguments.is_none());
    }

    #[test]
    fn test_require_treats_null_and_empty_as_missing() {
        let args = object(json!({"a": null, "b": "  ", "c": "ok", "d": 3}));
        let view = ToolArguments::new(&args);

        for field in ["a", "b", "missing"] {
            match view.require(field) {
                Err(ToolError::MissingArgument(name)) => assert_eq!(name, field),
                other => panic!("expected missing {field}, got {other:?}"),
            }
        }
        assert_eq!(view.require_str("c").unwrap(), "ok");
        assert!(matches!(
            view.require_str("d"),
            Err(ToolError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_require_all_reports_first_missing() {
        let args = object(json!({"dataset_id": "sales"}));
        let err = ToolArguments::new(&args)
            .require_all(&["dataset_id", "table_id"])
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: table_id");
    }

    #[test]
    fn test_parse_into_params() {
        #[derive(Deserialize)]
        struct Params {
            query: String,
            #[serde(default)]
            limit: Option<u32>,
        }

        let args = object(json!({"query": "select 1", "limit": 5}));
        let params: Params = ToolArguments::new(&args).parse().unwrap();
        assert_eq!(params.query, "select 1");
        assert_eq!(params.limit, Some(5));

        let bad = object(json!({"query": "x", "limit": "many"}));
        assert!(ToolArguments::new(&bad).parse::<Params>().is_err());
    }

    #[test]
    fn test_failure_envelope_shape() {
        let result: CallToolResult = InvocationResult::Failure("boom".into()).into();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isError"], json!(true));
        assert_eq!(value["content"].as_array().unwrap().len(), 1);
        assert_eq!(value["content"][0]["type"], json!("text"));
        let payload: Value =
            serde_json::from_str(value["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(payload, json!({"error": "boom"}));
    }
}
