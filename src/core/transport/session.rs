//! Transport sessions and their in-flight requests.
//!
//! A [`Session`] is one live connection: the whole process for STDIO, one
//! open event stream for SSE. It owns the cancellation token of every
//! request it is currently serving, keyed by JSON-RPC id, so that an
//! explicit `notifications/cancelled` or the connection closing can reach
//! the right handler.

use std::collections::HashMap;

use parking_lot::Mutex;
use rmcp::model::RequestId;
use tracing::{debug, warn};

use crate::core::cancellation::CancellationToken;

/// One active connection.
pub struct Session {
    id: String,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    closed: bool,
    next_generation: u64,
    in_flight: HashMap<RequestId, (u64, CancellationToken)>,
}

impl Session {
    /// Create an open session.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Track a new request and hand out its token.
    ///
    /// On a closed session the token is already cancelled.
    pub fn begin_request(&self, request_id: &RequestId) -> InFlightRequest<'_> {
        let key = request_id.clone();
        let token = CancellationToken::new();

        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            token.cancel();
            return InFlightRequest {
                session: self,
                key,
                generation: None,
                token,
            };
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        if state
            .in_flight
            .insert(key.clone(), (generation, token.clone()))
            .is_some()
        {
            warn!(session = %self.id, request_id = %key, "Request id reused while still in flight");
        }

        InFlightRequest {
            session: self,
            key,
            generation: Some(generation),
            token,
        }
    }

    /// Cancel the in-flight request with this id. Returns whether one was found.
    ///
    /// Ids compare as rmcp `RequestId`s, so `1` and `"1"` are different requests.
    pub fn cancel_request(&self, request_id: &RequestId) -> bool {
        let token = self
            .state
            .lock()
            .in_flight
            .get(request_id)
            .map(|(_, token)| token.clone());

        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => {
                debug!(session = %self.id, %request_id, "Cancel for unknown or finished request");
                false
            }
        }
    }

    /// Close the session and cancel everything still in flight.
    pub fn close(&self) {
        let tokens: Vec<CancellationToken> = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.in_flight.values().map(|(_, token)| token.clone()).collect()
        };

        if !tokens.is_empty() {
            debug!(session = %self.id, count = tokens.len(), "Cancelling in-flight requests");
        }
        for token in tokens {
            token.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of requests currently being served.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    fn finish(&self, key: &RequestId, generation: u64) {
        let mut state = self.state.lock();
        if matches!(state.in_flight.get(key), Some((g, _)) if *g == generation) {
            state.in_flight.remove(key);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A request being served; stops being tracked when dropped.
pub struct InFlightRequest<'a> {
    session: &'a Session,
    key: RequestId,
    generation: Option<u64>,
    token: CancellationToken,
}

impl InFlightRequest<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InFlightRequest<'_> {
    fn drop(&mut self) {
        if let Some(generation) = self.generation {
            self.session.finish(&self.key, generation);
        }
    }
}
