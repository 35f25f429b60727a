//! SSE transport implementation.
//!
//! Two endpoints cooperate:
//! - `GET /sse` opens a long-lived `text/event-stream`, announces the
//!   message endpoint in an `endpoint` event and becomes the active session.
//! - `POST /messages` accepts one JSON-RPC message and routes it to the
//!   active session; its response is pushed on that session's stream as a
//!   `message` event.
//!
//! Only one session is active at a time. A new `GET /sse` replaces the
//! previous one without notice; the superseded stream keeps receiving the
//! responses of requests it already had in flight and then ends. Messages
//! posted while no session exists are dropped, never queued.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt, stream};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, instrument, warn};

use super::session::Session;
use super::{TransportConfig, TransportError, TransportResult, config::SseConfig};
use crate::core::McpServer;

/// Path of the event stream endpoint.
pub const SSE_PATH: &str = "/sse";

/// Path of the inbound message endpoint.
pub const MESSAGES_PATH: &str = "/messages";

/// SSE transport handler.
pub struct SseTransport {
    config: SseConfig,
}

/// The session currently receiving routed messages.
#[derive(Clone)]
pub struct ActiveSession {
    session: Arc<Session>,
    outbound: mpsc::UnboundedSender<String>,
}

impl ActiveSession {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Queue an encoded message on the session's stream.
    fn push(&self, payload: String) -> bool {
        self.outbound.send(payload).is_ok()
    }
}

/// Single-slot holder of the active session.
///
/// Written only when a stream opens (replace) and when it closes (clear).
#[derive(Clone, Default)]
pub struct SessionSlot {
    current: Arc<Mutex<Option<ActiveSession>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `active`, returning the session it superseded.
    pub fn replace(&self, active: ActiveSession) -> Option<ActiveSession> {
        self.current.lock().replace(active)
    }

    /// The session messages are currently routed to.
    pub fn current(&self) -> Option<ActiveSession> {
        self.current.lock().clone()
    }

    /// Clear the slot if it still holds the session `id`.
    pub fn clear_if(&self, id: &str) -> bool {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|a| a.session.id() == id) {
            *current = None;
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.lock().is_none()
    }
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct SseState {
    server: McpServer,
    slot: SessionSlot,
}

impl SseState {
    pub fn new(server: McpServer, slot: SessionSlot) -> Self {
        Self { server, slot }
    }

    pub fn slot(&self) -> &SessionSlot {
        &self.slot
    }
}

/// Closes a session when its event stream is dropped.
struct StreamGuard {
    slot: SessionSlot,
    session: Arc<Session>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let was_active = self.slot.clear_if(self.session.id());
        self.session.close();
        info!(
            session_id = %self.session.id(),
            was_active,
            "SSE session closed"
        );
    }
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

impl SseTransport {
    /// Create a new SSE transport with the given config.
    pub fn new(config: SseConfig) -> Self {
        Self { config }
    }

    /// Create from TransportConfig (extracts SSE config).
    pub fn from_transport_config(config: &TransportConfig) -> Option<Self> {
        match config {
            TransportConfig::Sse(sse_config) => Some(Self::new(sse_config.clone())),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the HTTP router for `state`.
    pub fn router(&self, state: SseState) -> Router {
        let app = router(state);
        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app.layer(cors)
        } else {
            app
        }
    }

    /// Run the SSE transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(SseState::new(server, SessionSlot::new()));

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (SSE, CORS {})", addr, cors_status);
        info!("  → Events:   GET {}", SSE_PATH);
        info!("  → Messages: POST {}", MESSAGES_PATH);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Routes without middleware.
pub fn router(state: SseState) -> Router {
    Router::new()
        .route(SSE_PATH, get(open_stream))
        .route(MESSAGES_PATH, post(post_message))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<SseState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "server": state.server.name(),
        "sessionActive": !state.slot.is_empty(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Open the event stream and make it the active session.
async fn open_stream(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let session = Arc::new(Session::new(session_id.clone()));
    let (outbound, inbox) = mpsc::unbounded_channel::<String>();

    let superseded = state.slot.replace(ActiveSession {
        session: session.clone(),
        outbound,
    });
    if let Some(previous) = superseded {
        warn!(
            previous = %previous.session.id(),
            session_id = %session_id,
            "New SSE connection supersedes the active session"
        );
    }
    info!(session_id = %session_id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{MESSAGES_PATH}?sessionId={session_id}"));

    let guard = StreamGuard {
        slot: state.slot.clone(),
        session,
    };
    let messages = stream::unfold((inbox, guard), |(mut inbox, guard)| async move {
        let payload = inbox.recv().await?;
        let event = Event::default().event("message").data(payload);
        Some((Ok(event), (inbox, guard)))
    });

    let events = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(messages);
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Route one inbound message to the active session.
#[instrument(skip_all, fields(session_id))]
async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(active) = state.slot.current() else {
        warn!("Message received with no active SSE session; dropping it");
        return (StatusCode::SERVICE_UNAVAILABLE, "No active SSE session").into_response();
    };
    tracing::Span::current().record("session_id", active.session.id());

    if let Some(requested) = query.session_id.as_deref() {
        if requested != active.session.id() {
            warn!(
                requested,
                "Message addressed to a superseded session; routing to the active one"
            );
        }
    }

    let server = state.server.clone();
    tokio::spawn(async move {
        let Some(response) = server.handle_message(&body, &active.session).await else {
            return;
        };
        match serde_json::to_string(&response) {
            Ok(encoded) => {
                if !active.push(encoded) {
                    warn!(
                        session_id = %active.session.id(),
                        "Session stream closed before the response could be delivered"
                    );
                }
            }
            Err(e) => error!("Failed to encode response: {}", e),
        }
    });

    debug!("Message accepted");
    (StatusCode::ACCEPTED, "Accepted").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::domains::tools::testing::{BlockingTool, EchoTool};
    use crate::domains::tools::ToolRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_state() -> (SseState, BlockingTool) {
        let blocking = BlockingTool::new();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        registry.register(Arc::new(blocking.clone())).unwrap();
        let server = McpServer::new(Config::default(), registry, None);
        (SseState::new(server, SessionSlot::new()), blocking)
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(MESSAGES_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn open() -> Request<Body> {
        Request::builder().uri(SSE_PATH).body(Body::empty()).unwrap()
    }

    async fn next_event(body: &mut Body) -> String {
        loop {
            let frame = body.frame().await.expect("stream ended").unwrap();
            if let Ok(data) = frame.into_data() {
                let text = String::from_utf8(data.to_vec()).unwrap();
                // Skip keep-alive comments.
                if !text.starts_with(':') {
                    return text;
                }
            }
        }
    }

    fn event_data(event: &str) -> &str {
        event
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .expect("event has data")
    }

    #[tokio::test]
    async fn test_post_without_session_is_dropped() {
        let (state, _) = test_state();
        let app = router(state.clone());

        let response = app
            .oneshot(post(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(state.slot().is_empty());
    }

    #[tokio::test]
    async fn test_session_routes_responses_to_stream() {
        let (state, _) = test_state();
        let app = router(state.clone());

        let response = app.clone().oneshot(open()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );
        assert!(!state.slot().is_empty());

        let mut body = response.into_body();
        let endpoint = next_event(&mut body).await;
        assert!(endpoint.contains("event: endpoint"));
        let session_id = state.slot().current().unwrap().session().id().to_string();
        assert_eq!(
            event_data(&endpoint),
            format!("{MESSAGES_PATH}?sessionId={session_id}")
        );

        let accepted = app
            .clone()
            .oneshot(post(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);

        let message = next_event(&mut body).await;
        assert!(message.contains("event: message"));
        let reply: Value = serde_json::from_str(event_data(&message)).unwrap();
        assert_eq!(reply["id"], json!(1));
        assert_eq!(reply["result"]["tools"][0]["name"], json!("echo"));

        drop(body);
        assert!(state.slot().is_empty());
    }

    #[tokio::test]
    async fn test_new_session_supersedes_previous() {
        let (state, _) = test_state();
        let app = router(state.clone());

        let first = app.clone().oneshot(open()).await.unwrap();
        let first_id = state.slot().current().unwrap().session().id().to_string();
        let second = app.clone().oneshot(open()).await.unwrap();
        let second_id = state.slot().current().unwrap().session().id().to_string();
        assert_ne!(first_id, second_id);

        // Closing the superseded stream leaves the new session in place.
        drop(first);
        assert_eq!(
            state.slot().current().unwrap().session().id(),
            second_id.as_str()
        );

        drop(second);
        assert!(state.slot().is_empty());
    }

    #[tokio::test]
    async fn test_closing_stream_cancels_in_flight_call() {
        let (state, blocking) = test_state();
        let app = router(state.clone());

        let response = app.clone().oneshot(open()).await.unwrap();
        let mut body = response.into_body();
        next_event(&mut body).await;

        let session = state.slot().current().unwrap().session().clone();
        let accepted = app
            .oneshot(post(
                r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"block","arguments":{}}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);
        blocking.started().await;
        assert_eq!(session.in_flight(), 1);

        drop(body);
        assert!(session.is_closed());
        blocking.finished().await;
        assert_eq!(blocking.cancellations(), 1);
    }

    #[test]
    fn test_slot_clear_only_matching_session() {
        let slot = SessionSlot::new();
        let (outbound, _inbox) = mpsc::unbounded_channel();
        slot.replace(ActiveSession {
            session: Arc::new(Session::new("a")),
            outbound,
        });

        assert!(!slot.clear_if("b"));
        assert!(!slot.is_empty());
        assert!(slot.clear_if("a"));
        assert!(slot.is_empty());
    }
}
