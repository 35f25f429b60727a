//! JSON-RPC 2.0 framing shared by every transport.
//!
//! Envelopes, error objects and ids are rmcp's model types. What lives here
//! is the inbound side rmcp's typed `ClientJsonRpcMessage` cannot express:
//! a request for a method we do not know must still be read far enough to
//! answer `-32601` with its id, and a message that is not JSON-RPC at all
//! must be answered with `"id": null`.

use rmcp::model::{
    ErrorCode, ErrorData, JsonRpcError, JsonRpcResponse as JsonRpcResult, JsonRpcVersion2_0,
    ProtocolVersion, RequestId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V_2024_11_05;

/// An inbound request or notification, with its method still untyped.
///
/// A message without `id` is a notification and never gets a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion2_0,
    #[serde(default)]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A reply to send back to the peer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JsonRpcResponse {
    Result(JsonRpcResult<Value>),
    Error(JsonRpcError),
    /// An error for a message whose id could not be read.
    Unaddressed(UnaddressedError),
}

/// Error envelope serialized with `"id": null`.
#[derive(Debug, Clone, Serialize)]
pub struct UnaddressedError {
    jsonrpc: JsonRpcVersion2_0,
    id: (),
    error: ErrorData,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Result(JsonRpcResult {
            jsonrpc: JsonRpcVersion2_0,
            id,
            result,
        })
    }

    /// Error reply; without an id it is sent with `"id": null`.
    pub fn error(id: Option<RequestId>, error: ErrorData) -> Self {
        match id {
            Some(id) => Self::Error(JsonRpcError {
                jsonrpc: JsonRpcVersion2_0,
                id,
                error,
            }),
            None => Self::Unaddressed(UnaddressedError {
                jsonrpc: JsonRpcVersion2_0,
                id: (),
                error,
            }),
        }
    }

    /// Unparseable input; the id is unknown.
    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::error(None, ErrorData::parse_error(format!("Parse error: {detail}"), None))
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::error(id, ErrorData::invalid_request("Invalid Request", None))
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::error(
            Some(id),
            ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
                None,
            ),
        )
    }

    pub fn invalid_params(id: RequestId, msg: impl Into<String>) -> Self {
        Self::error(Some(id), ErrorData::invalid_params(msg.into(), None))
    }

    pub fn internal_error(id: RequestId, msg: impl Into<String>) -> Self {
        Self::error(Some(id), ErrorData::internal_error(msg.into(), None))
    }

    /// The id this reply answers, if it could be read.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Result(result) => Some(&result.id),
            Self::Error(error) => Some(&error.id),
            Self::Unaddressed(_) => None,
        }
    }

    /// The error object, for error replies.
    pub fn error_data(&self) -> Option<&ErrorData> {
        match self {
            Self::Result(_) => None,
            Self::Error(error) => Some(&error.error),
            Self::Unaddressed(error) => Some(&error.error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_data().is_some()
    }
}

/// What an inbound JSON value turned out to be.
#[derive(Debug)]
pub enum Inbound {
    /// A request or notification from the peer.
    Request(JsonRpcRequest),
    /// A response to something we sent; this server never sends requests.
    Response,
    /// Well-formed JSON that is not a JSON-RPC 2.0 message.
    Invalid { id: Option<RequestId> },
}

impl Inbound {
    /// Classify a decoded JSON value.
    pub fn classify(value: Value) -> Self {
        let id = value
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value::<RequestId>(id).ok());
        let (has_method, is_response) = match value.as_object() {
            Some(object) => (
                object.contains_key("method"),
                object.contains_key("result") || object.contains_key("error"),
            ),
            None => return Self::Invalid { id },
        };

        if has_method {
            match serde_json::from_value::<JsonRpcRequest>(value) {
                Ok(request) => Self::Request(request),
                Err(_) => Self::Invalid { id },
            }
        } else if is_response {
            Self::Response
        } else {
            Self::Invalid { id }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_request_and_notification() {
        let request = Inbound::classify(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}));
        assert!(matches!(request, Inbound::Request(ref r) if !r.is_notification()));

        let notification =
            Inbound::classify(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}));
        assert!(matches!(notification, Inbound::Request(ref r) if r.is_notification()));
    }

    #[test]
    fn test_classify_peer_response() {
        let response = Inbound::classify(json!({"jsonrpc": "2.0", "id": 3, "result": {}}));
        assert!(matches!(response, Inbound::Response));
    }

    #[test]
    fn test_classify_invalid_keeps_id() {
        match Inbound::classify(json!({"jsonrpc": "1.0", "id": 7, "method": "ping"})) {
            Inbound::Invalid { id } => assert_eq!(id, Some(RequestId::Number(7))),
            other => panic!("expected invalid, got {other:?}"),
        }
        assert!(matches!(
            Inbound::classify(json!([1, 2])),
            Inbound::Invalid { id: None }
        ));
        assert!(matches!(
            Inbound::classify(json!({"jsonrpc": "2.0", "id": 1.5, "method": "ping"})),
            Inbound::Invalid { id: None }
        ));
    }

    #[test]
    fn test_error_reply_serialization() {
        let value = serde_json::to_value(JsonRpcResponse::parse_error("eof")).unwrap();
        assert_eq!(value["jsonrpc"], json!("2.0"));
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], json!(-32700));
        assert!(value.get("result").is_none());

        let value =
            serde_json::to_value(JsonRpcResponse::method_not_found(RequestId::Number(4), "nope"))
                .unwrap();
        assert_eq!(value["id"], json!(4));
        assert_eq!(value["error"]["code"], json!(-32601));
        assert_eq!(value["error"]["message"], json!("Method not found: nope"));
    }

    #[test]
    fn test_success_reply_keeps_string_id() {
        let reply = JsonRpcResponse::success(RequestId::String("abc".into()), json!({}));
        assert!(!reply.is_error());
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": "abc", "result": {}}));
    }
}
