//! Debounced state broadcasting
//!
//! Coalesces bursts of state changes into one outbound `PLAYER_STATE`
//! message. At most one flush is pending at a time; every new request
//! merges its overrides into the pending ones and restarts the window.
//!
//! Every snapshot is read from the store and queued to the connections
//! under the broadcaster's lock, so clients receive snapshots in the order
//! they were taken and a newly registered client never misses one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::state::{StateStore, StateUpdate};
use crate::websocket::connection::{ConnectionInfo, ConnectionManager};
use crate::websocket::messages::ServerMessage;

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Fans state snapshots out to every connection, immediately or debounced
///
/// Cloning is cheap; all clones share the same pending flush.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    store: StateStore,
    connections: ConnectionManager,
    window: Duration,
    pending: Mutex<PendingFlush>,
    closed: AtomicBool,
}

#[derive(Default)]
struct PendingFlush {
    /// Overrides accumulated since the last flush
    overrides: StateUpdate,
    task: Option<ScheduledFlush>,
    generation: u64,
}

/// A timer that will flush the pending overrides once the window elapses
struct ScheduledFlush {
    generation: u64,
    handle: JoinHandle<()>,
}

impl ScheduledFlush {
    fn cancel(self) {
        self.handle.abort();
    }
}

impl Broadcaster {
    pub fn new(store: StateStore, connections: ConnectionManager, window: Duration) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                store,
                connections,
                window,
                pending: Mutex::new(PendingFlush::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Debounce window in use
    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Request a broadcast after the debounce window
    ///
    /// `overrides` carries transient fields that are shown to clients but
    /// not written to the store; callers that already updated the store
    /// pass [`StateUpdate::default()`]. Replaces any pending flush: the
    /// overrides are merged over the pending ones (last write wins per
    /// field) and the timer restarts.
    pub fn schedule(&self, overrides: StateUpdate) {
        if self.is_closed() {
            return;
        }

        let mut pending = self.inner.lock_pending();
        if let Some(task) = pending.task.take() {
            task.cancel();
        }

        pending.overrides.merge(overrides);
        pending.generation = pending.generation.wrapping_add(1);
        let generation = pending.generation;

        let inner: Weak<BroadcasterInner> = Arc::downgrade(&self.inner);
        let window = self.inner.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inner) = inner.upgrade() {
                inner.flush(generation);
            }
        });

        pending.task = Some(ScheduledFlush { generation, handle });
    }

    /// Broadcast the current state right away
    ///
    /// Any pending flush is cancelled and its overrides are folded under
    /// `overrides`, so nothing deferred lands after this message.
    /// Returns the number of connections the message was queued for.
    pub fn broadcast_now(&self, overrides: StateUpdate) -> usize {
        if self.is_closed() {
            return 0;
        }

        let mut pending = self.inner.lock_pending();
        if let Some(task) = pending.task.take() {
            task.cancel();
        }
        let mut merged = std::mem::take(&mut pending.overrides);
        merged.merge(overrides);

        self.inner.send(&pending, &merged)
    }

    /// Register a connection with the current snapshot as its first message
    ///
    /// Runs under the same lock as broadcasts: the client either sees a
    /// change in its initial snapshot or receives the broadcast carrying it.
    pub fn register(
        &self,
        info: ConnectionInfo,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> bool {
        let _pending = self.inner.lock_pending();
        let snapshot = self.inner.store.get().snapshot();
        self.inner
            .connections
            .add_connection(info, sender, ServerMessage::PlayerState(snapshot))
    }

    /// Whether a debounced flush is waiting to fire
    pub fn has_pending(&self) -> bool {
        self.inner.lock_pending().task.is_some()
    }

    /// Cancel any pending flush and refuse further broadcasts
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        let mut pending = self.inner.lock_pending();
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(task) = pending.task.take() {
            task.cancel();
            tracing::debug!("Cancelled pending state broadcast");
        }
        pending.overrides = StateUpdate::default();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl BroadcasterInner {
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, PendingFlush> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fire the flush scheduled as `generation`, unless it was superseded
    fn flush(&self, generation: u64) {
        let mut pending = self.lock_pending();
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        match &pending.task {
            Some(task) if task.generation == generation => {}
            _ => return,
        }
        pending.task = None;
        let overrides = std::mem::take(&mut pending.overrides);

        let sent = self.send(&pending, &overrides);
        tracing::trace!(sent, "Flushed debounced state broadcast");
    }

    /// Snapshot the store and queue it to every connection
    ///
    /// Takes the pending guard to prove the broadcaster lock is held.
    fn send(&self, _pending: &PendingFlush, overrides: &StateUpdate) -> usize {
        let snapshot = self.store.get().overlay(overrides).snapshot();
        self.connections
            .broadcast(ServerMessage::PlayerState(snapshot))
    }
}

impl Drop for BroadcasterInner {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = pending.task.take() {
            task.cancel();
        }
    }
}
