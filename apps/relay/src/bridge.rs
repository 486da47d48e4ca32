//! Bridge from player notifications to the state store
//!
//! Subscribes to an [`EventSource`], writes each event into the
//! [`StateStore`] and asks the [`Broadcaster`] to publish the result.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broadcaster::Broadcaster;
use crate::player::{EventSource, PlayerEvent};
use crate::state::{StateStore, StateUpdate};
use crate::websocket::messages::Song;

/// Fields of a playback notification that are worth a broadcast
#[derive(Debug, Clone, PartialEq)]
struct PlaybackKey {
    video_id: String,
    is_paused: bool,
    elapsed_seconds: f64,
}

impl From<&Song> for PlaybackKey {
    fn from(song: &Song) -> Self {
        Self {
            video_id: song.video_id.clone(),
            is_paused: song.is_paused,
            elapsed_seconds: song.elapsed_seconds,
        }
    }
}

/// Forwards player events into the store and broadcaster
pub struct EventBridge {
    store: StateStore,
    broadcaster: Broadcaster,
    last_playback: Option<PlaybackKey>,
}

impl EventBridge {
    pub fn new(store: StateStore, broadcaster: Broadcaster) -> Self {
        Self {
            store,
            broadcaster,
            last_playback: None,
        }
    }

    /// Apply one event
    ///
    /// Playback notifications that repeat the last observed song id, pause
    /// flag and elapsed time are ignored. Returns whether the event was
    /// forwarded.
    pub fn handle_event(&mut self, event: PlayerEvent) -> bool {
        match event {
            PlayerEvent::PlaybackChanged(song) => {
                let key = PlaybackKey::from(&song);
                let changed = self.last_playback.as_ref() != Some(&key);
                self.last_playback = Some(key);

                if !changed {
                    return false;
                }
                self.debounced(StateUpdate::song(song));
            }
            PlayerEvent::VolumeChanged(volume) => self.debounced(StateUpdate::volume(volume)),
            PlayerEvent::ShuffleChanged(shuffle) => self.debounced(StateUpdate::shuffle(shuffle)),
            PlayerEvent::RepeatChanged(repeat) => self.immediate(StateUpdate::repeat(repeat)),
            PlayerEvent::Seeked(position) => self.immediate(StateUpdate::position(position)),
            PlayerEvent::MuteChanged(muted) => self.immediate(StateUpdate::muted(muted)),
        }
        true
    }

    fn debounced(&self, update: StateUpdate) {
        self.store.apply(&update);
        self.broadcaster.schedule(StateUpdate::default());
    }

    fn immediate(&self, update: StateUpdate) {
        self.store.apply(&update);
        self.broadcaster.broadcast_now(StateUpdate::default());
    }

    /// Subscribe to `source` and process its events on a background task
    pub fn start(mut self, source: &dyn EventSource) -> BridgeHandle {
        let mut events = source.subscribe();
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    result = events.recv() => match result {
                        Ok(event) => {
                            tracing::trace!(event = ?event, "Player event received");
                            self.handle_event(event);
                        }
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(lagged = n, "Player event receiver lagged");
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("Player event source closed");
                            break;
                        }
                    },
                }
            }
            tracing::debug!("Event bridge stopped");
        });

        BridgeHandle {
            token,
            task: Some(task),
        }
    }
}

/// Handle to a running [`EventBridge`]; stopping it unsubscribes
pub struct BridgeHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    /// Cancel the subscription task and wait for it to exit
    ///
    /// Safe to call more than once.
    pub async fn stop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Event bridge task failed");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
