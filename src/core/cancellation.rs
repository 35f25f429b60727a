//! Per-request cancellation.
//!
//! Every inbound request gets its own [`CancellationToken`], created by the
//! transport session and handed by reference to the tool handler. A handler
//! that starts an upstream operation which can outlive the request ties the
//! two together with [`with_cancellation`]:
//!
//! 1. [`CancellationToken::ensure_active`] before starting, so an already
//!    cancelled request never reaches the upstream system.
//! 2. A one-shot listener registered with [`CancellationToken::on_cancel`]
//!    that asks the upstream system to stop.
//! 3. The listener is removed when its [`CancelSubscription`] is dropped,
//!    whatever the outcome of the operation.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken as Signal;

/// Error returned when a request was cancelled before or during an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Request was cancelled")]
pub struct Cancelled;

type Listener = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation handle for a single in-flight request.
///
/// Clones share the same state. Cancelling is idempotent; listeners run at
/// most once, on the thread that calls [`cancel`](Self::cancel).
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    signal: Signal,
    listeners: Mutex<Listeners>,
}

#[derive(Default)]
struct Listeners {
    cancelled: bool,
    next_id: u64,
    pending: BTreeMap<u64, Listener>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.signal.is_cancelled()
    }

    /// `Err(Cancelled)` if cancellation has already been requested.
    pub fn ensure_active(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Request cancellation and run every registered listener once.
    pub fn cancel(&self) {
        let fired = {
            let mut listeners = self.inner.listeners.lock();
            if listeners.cancelled {
                return;
            }
            listeners.cancelled = true;
            self.inner.signal.cancel();
            std::mem::take(&mut listeners.pending)
        };

        // Listeners run outside the lock so they may touch the token.
        for (_, listener) in fired {
            listener();
        }
    }

    /// Register a one-shot listener for cancellation.
    ///
    /// If the token is already cancelled the listener runs immediately.
    /// Dropping the returned subscription deregisters the listener.
    pub fn on_cancel<F>(&self, listener: F) -> CancelSubscription
    where
        F: FnOnce() + Send + 'static,
    {
        let mut listeners = self.inner.listeners.lock();
        if listeners.cancelled {
            drop(listeners);
            listener();
            return CancelSubscription {
                token: self.clone(),
                id: None,
            };
        }

        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.pending.insert(id, Box::new(listener));

        CancelSubscription {
            token: self.clone(),
            id: Some(id),
        }
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        self.inner.signal.cancelled().await
    }

    /// Number of listeners still waiting for cancellation.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().pending.len()
    }

    fn deregister(&self, id: u64) {
        self.inner.listeners.lock().pending.remove(&id);
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Registration of a cancellation listener; deregisters on drop.
#[must_use = "dropping the subscription deregisters the listener"]
pub struct CancelSubscription {
    token: CancellationToken,
    id: Option<u64>,
}

impl CancelSubscription {
    /// Deregister the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Whether the listener is still registered and has not fired.
    pub fn is_pending(&self) -> bool {
        match self.id {
            Some(id) => self.token.inner.listeners.lock().pending.contains_key(&id),
            None => false,
        }
    }
}

impl Drop for CancelSubscription {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.token.deregister(id);
        }
    }
}

/// Run `operation` for as long as `token` stays active.
///
/// `on_cancel` is registered for the duration of the operation and fires
/// once if the token is cancelled, including when it was already cancelled
/// on entry. The local wait is abandoned as soon as cancellation is observed;
/// whatever `on_cancel` started upstream is not awaited.
pub async fn with_cancellation<F, L>(
    token: &CancellationToken,
    on_cancel: L,
    operation: F,
) -> Result<F::Output, Cancelled>
where
    F: Future,
    L: FnOnce() + Send + 'static,
{
    let _subscription = token.on_cancel(on_cancel);

    tokio::select! {
        biased;
        () = token.cancelled() => Err(Cancelled),
        output = operation => Ok(output),
    }
}
