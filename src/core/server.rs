//! MCP Server implementation.
//!
//! [`McpServer`] is the protocol state machine shared by every transport:
//! it takes one raw JSON-RPC message and the session it arrived on, and
//! produces the response to send back, if any. Tool calls go through the
//! [`Dispatcher`]; prompts through the optional [`PromptService`].
//!
//! Adding a tool or prompt does not require modifying this file.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, CancelledNotificationParam, EmptyObject,
    GetPromptRequestParam, Implementation, InitializeResult, ListPromptsResult, ListToolsResult,
    RequestId, ServerCapabilities, Tool,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::config::{Config, ServiceKind};
use super::protocol::{Inbound, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use super::transport::Session;
use crate::core::cancellation::CancellationToken;
use crate::domains::prompts::PromptService;
use crate::domains::tools::{Dispatcher, InvocationRequest, ToolRegistry, build_tool_registry};

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    config: Arc<Config>,
    name: Arc<str>,
    dispatcher: Dispatcher,
    prompts: Option<Arc<PromptService>>,
}

impl McpServer {
    /// Create a server over an already built tool registry.
    pub fn new(config: Config, registry: ToolRegistry, prompts: Option<PromptService>) -> Self {
        let name: Arc<str> = config.server_name().into();
        Self {
            config: Arc::new(config),
            name,
            dispatcher: Dispatcher::new(registry),
            prompts: prompts.map(Arc::new),
        }
    }

    /// Validate credentials and build the tools and prompts of the
    /// configured service.
    pub fn from_config(config: Config) -> crate::core::Result<Self> {
        let credentials = config.service_credentials()?;
        let registry = build_tool_registry(&credentials)?;
        let prompts = PromptService::for_service(config.service);
        info!(
            service = %config.service,
            tools = registry.len(),
            prompts = prompts.as_ref().map_or(0, PromptService::len),
            "Server initialized"
        );
        Ok(Self::new(config, registry, prompts))
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn service(&self) -> ServiceKind {
        self.config.service
    }

    /// The tool catalog.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.dispatcher.list_tools()
    }

    /// Run one tool call under `cancellation` and wrap the outcome.
    pub async fn call_tool(
        &self,
        request: InvocationRequest,
        cancellation: &CancellationToken,
    ) -> CallToolResult {
        self.dispatcher.handle(request, cancellation).await.into()
    }

    /// Handle one inbound message. Returns `None` for notifications and
    /// for responses sent by the peer.
    #[instrument(skip_all, fields(session = %session.id()))]
    pub async fn handle_message(&self, raw: &str, session: &Session) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse message: {}", e);
                return Some(JsonRpcResponse::parse_error(e));
            }
        };

        match Inbound::classify(value) {
            Inbound::Response => {
                debug!("Ignoring response from peer");
                None
            }
            Inbound::Invalid { id } => {
                warn!("Received a message that is not JSON-RPC 2.0");
                Some(JsonRpcResponse::invalid_request(id))
            }
            Inbound::Request(request) => match request.id.clone() {
                None => {
                    self.handle_notification(&request, session);
                    None
                }
                Some(id) => Some(self.handle_request(id, request, session).await),
            },
        }
    }

    async fn handle_request(
        &self,
        id: RequestId,
        request: JsonRpcRequest,
        session: &Session,
    ) -> JsonRpcResponse {
        debug!(method = %request.method, "Handling request");

        match request.method.as_str() {
            "initialize" => {
                info!("Client initializing");
                respond(id, &self.initialize_result())
            }
            "ping" => respond(id, &EmptyObject {}),
            "tools/list" => {
                info!("Listing tools");
                respond(id, &ListToolsResult::with_all_items(self.list_tools()))
            }
            "tools/call" => self.handle_call_tool(id, request.params, session).await,
            "prompts/list" if self.prompts.is_some() => {
                let prompts = self
                    .prompts
                    .as_ref()
                    .map(|p| p.list_prompts())
                    .unwrap_or_default();
                respond(id, &ListPromptsResult::with_all_items(prompts))
            }
            "prompts/get" if self.prompts.is_some() => self.handle_get_prompt(id, request.params),
            method => {
                warn!(method, "Method not found");
                JsonRpcResponse::method_not_found(id, method)
            }
        }
    }

    async fn handle_call_tool(
        &self,
        id: RequestId,
        params: Option<Value>,
        session: &Session,
    ) -> JsonRpcResponse {
        let params: CallToolRequestParam = match parse_params(params, "tools/call") {
            Ok(params) => params,
            Err(message) => return JsonRpcResponse::invalid_params(id, message),
        };

        let in_flight = session.begin_request(&id);
        let result = self.call_tool(params.into(), in_flight.token()).await;
        drop(in_flight);

        respond(id, &result)
    }

    fn handle_get_prompt(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let Some(prompts) = self.prompts.as_ref() else {
            return JsonRpcResponse::method_not_found(id, "prompts/get");
        };
        let params: GetPromptRequestParam = match parse_params(params, "prompts/get") {
            Ok(params) => params,
            Err(message) => return JsonRpcResponse::invalid_params(id, message),
        };

        info!(prompt = %params.name, "Getting prompt");
        respond(
            id,
            &prompts.get_prompt_or_error(&params.name, params.arguments.as_ref()),
        )
    }

    fn handle_notification(&self, notification: &JsonRpcRequest, session: &Session) {
        match notification.method.as_str() {
            "notifications/cancelled" => {
                match parse_params::<CancelledNotificationParam>(
                    notification.params.clone(),
                    "notifications/cancelled",
                ) {
                    Ok(params) => {
                        let found = session.cancel_request(&params.request_id);
                        info!(
                            request_id = %params.request_id,
                            reason = params.reason.as_deref().unwrap_or(""),
                            found,
                            "Cancellation requested"
                        );
                    }
                    Err(message) => warn!("Ignoring cancellation notification: {}", message),
                }
            }
            "notifications/initialized" => info!("Client initialized"),
            method => debug!(method, "Ignoring notification"),
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        let capabilities = if self.prompts.is_some() {
            ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build()
        } else {
            ServerCapabilities::builder().enable_tools().build()
        };
        InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            capabilities,
            server_info: Implementation {
                name: self.name().to_string(),
                title: None,
                version: self.version().to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(instructions(self.service()).to_string()),
        }
    }
}

fn instructions(service: ServiceKind) -> &'static str {
    match service {
        ServiceKind::Fetch => "Fetches web pages. Use the fetch tool to read the contents of a URL.",
        ServiceKind::BigQuery => {
            "Queries Google BigQuery. List datasets and tables, inspect schemas, then run Standard SQL with bigquery_execute_query."
        }
        ServiceKind::Slack => "Reads a Slack workspace: channels, channel history and user profiles.",
        ServiceKind::Confluence => "Searches and reads Confluence pages.",
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>, method: &str) -> Result<T, String> {
    let params = params.ok_or_else(|| format!("Missing {method} params"))?;
    serde_json::from_value(params).map_err(|e| format!("Invalid {method} params: {e}"))
}

fn respond(id: RequestId, result: &impl Serialize) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::internal_error(id, format!("Failed to encode result: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;
    use serde_json::json;
    use crate::domains::tools::definitions::BigQueryExecuteQueryTool;
    use crate::domains::tools::definitions::bigquery::stub::StubWarehouse;
    use crate::domains::tools::testing::{BlockingTool, EchoTool};

    fn echo_server() -> McpServer {
        McpServer::new(Config::default(), ToolRegistry::new().with(EchoTool).unwrap(), None)
    }

    fn bigquery_server() -> McpServer {
        let registry = ToolRegistry::new()
            .with(BigQueryExecuteQueryTool::new(Arc::new(StubWarehouse::default())))
            .unwrap();
        McpServer::new(
            Config::default().with_service(ServiceKind::BigQuery),
            registry,
            PromptService::for_service(ServiceKind::BigQuery),
        )
    }

    async fn send(server: &McpServer, message: Value) -> Value {
        let session = Session::new("test");
        let response = server
            .handle_message(&message.to_string(), &session)
            .await
            .expect("expected a response");
        serde_json::to_value(response).unwrap()
    }

    fn error_code(response: &Value) -> i64 {
        response["error"]["code"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = send(
            &echo_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        let result = &response["result"];
        assert_eq!(result["protocolVersion"], json!("2024-11-05"));
        assert_eq!(result["serverInfo"]["name"], json!("fetch-mcp-server"));
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"].get("prompts").is_none());

        let response = send(
            &bigquery_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
        )
        .await;
        assert!(response["result"]["capabilities"]["prompts"].is_object());
    }

    #[tokio::test]
    async fn test_ping_and_tools_list() {
        let server = echo_server();
        let pong = send(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
        assert_eq!(pong["result"], json!({}));

        let first = send(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
        let second = send(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
        assert_eq!(first, second);
        assert_eq!(first["result"]["tools"][0]["name"], json!("echo"));
        assert!(first["result"]["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call_success_and_failures() {
        let server = echo_server();

        let ok = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "echo", "arguments": {"x": 1}}}),
        )
        .await;
        assert_eq!(ok["result"]["content"][0]["text"], json!("{\"x\":1}"));
        assert_ne!(ok["result"]["isError"], json!(true));

        let unknown = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "does_not_exist", "arguments": {}}}),
        )
        .await;
        assert_eq!(unknown["result"]["isError"], json!(true));
        assert_eq!(
            unknown["result"]["content"][0]["text"],
            json!("{\"error\":\"Unknown tool: does_not_exist\"}")
        );

        let no_args = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "echo"}}),
        )
        .await;
        assert_eq!(
            no_args["result"]["content"][0]["text"],
            json!("{\"error\":\"No arguments provided\"}")
        );
    }

    #[tokio::test]
    async fn test_missing_query_argument() {
        let response = send(
            &bigquery_server(),
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call",
                   "params": {"name": "bigquery_execute_query", "arguments": {}}}),
        )
        .await;
        assert_eq!(response["result"]["isError"], json!(true));
        assert_eq!(
            response["result"]["content"][0]["text"],
            json!("{\"error\":\"Missing required argument: query\"}")
        );
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = echo_server();
        let session = Session::new("test");

        let parse = server.handle_message("{not json", &session).await.unwrap();
        assert_eq!(parse.error_data().unwrap().code, ErrorCode::PARSE_ERROR);
        assert!(parse.id().is_none());
        assert_eq!(serde_json::to_value(&parse).unwrap()["id"], Value::Null);

        let invalid = send(&server, json!({"jsonrpc": "1.0", "id": 9, "method": "ping"})).await;
        assert_eq!(error_code(&invalid), i64::from(ErrorCode::INVALID_REQUEST.0));
        assert_eq!(invalid["id"], json!(9));

        let unknown = send(&server, json!({"jsonrpc": "2.0", "id": 10, "method": "nope"})).await;
        assert_eq!(error_code(&unknown), i64::from(ErrorCode::METHOD_NOT_FOUND.0));

        let no_params = send(&server, json!({"jsonrpc": "2.0", "id": 11, "method": "tools/call"})).await;
        assert_eq!(error_code(&no_params), i64::from(ErrorCode::INVALID_PARAMS.0));

        let no_name = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 12, "method": "tools/call", "params": {"arguments": {}}}),
        )
        .await;
        assert_eq!(error_code(&no_name), i64::from(ErrorCode::INVALID_PARAMS.0));

        let bad_arguments = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 13, "method": "tools/call",
                   "params": {"name": "echo", "arguments": "x"}}),
        )
        .await;
        assert_eq!(error_code(&bad_arguments), i64::from(ErrorCode::INVALID_PARAMS.0));
        assert_eq!(bad_arguments["id"], json!(13));
    }

    #[tokio::test]
    async fn test_notifications_and_peer_responses_get_no_reply() {
        let server = echo_server();
        let session = Session::new("test");
        for message in [
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 77}}),
            json!({"jsonrpc": "2.0", "method": "tools/call"}),
            json!({"jsonrpc": "2.0", "id": 1, "result": {}}),
        ] {
            assert!(
                server
                    .handle_message(&message.to_string(), &session)
                    .await
                    .is_none()
            );
        }
    }

    #[tokio::test]
    async fn test_prompts_only_where_declared() {
        let unavailable = send(
            &echo_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "prompts/list"}),
        )
        .await;
        assert_eq!(error_code(&unavailable), i64::from(ErrorCode::METHOD_NOT_FOUND.0));

        let server = bigquery_server();
        let list = send(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "prompts/list"})).await;
        assert_eq!(list["result"]["prompts"][0]["name"], json!("write_query"));

        let missing = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "prompts/get",
                   "params": {"name": "write_query"}}),
        )
        .await;
        assert_eq!(
            missing["result"]["messages"][0]["content"]["text"],
            json!("Error: Missing required argument: question")
        );

        let rendered = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "prompts/get",
                   "params": {"name": "explore_dataset", "arguments": {"dataset_id": "sales"}}}),
        )
        .await;
        let text = rendered["result"]["messages"][0]["content"]["text"]
            .as_str()
            .unwrap();
        assert!(text.contains("`sales`"));
    }

    #[tokio::test]
    async fn test_cancel_notification_reaches_in_flight_call() {
        let blocking = BlockingTool::new();
        let server = McpServer::new(
            Config::default(),
            ToolRegistry::new().with(blocking.clone()).unwrap(),
            None,
        );
        let session = Arc::new(Session::new("test"));

        let call = tokio::spawn({
            let server = server.clone();
            let session = session.clone();
            async move {
                let message = json!({"jsonrpc": "2.0", "id": 42, "method": "tools/call",
                                     "params": {"name": "block", "arguments": {}}});
                server.handle_message(&message.to_string(), &session).await
            }
        });
        blocking.started().await;
        assert_eq!(session.in_flight(), 1);

        let cancel = json!({"jsonrpc": "2.0", "method": "notifications/cancelled",
                            "params": {"requestId": 42, "reason": "user abort"}});
        assert!(server.handle_message(&cancel.to_string(), &session).await.is_none());

        let response = serde_json::to_value(call.await.unwrap().unwrap()).unwrap();
        assert_eq!(response["id"], json!(42));
        assert_eq!(
            response["result"]["content"][0]["text"],
            json!("{\"error\":\"Request was cancelled\"}")
        );
        assert_eq!(blocking.cancellations(), 1);
        assert_eq!(session.in_flight(), 0);
    }
}
