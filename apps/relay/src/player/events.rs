//! Player notifications and the in-memory event hub
//!
//! Hosts push [`PlayerEvent`]s into a [`PlayerEvents`] hub; the relay
//! subscribes through the [`EventSource`] trait. A subscription is a
//! broadcast receiver, so dropping it unsubscribes.

use tokio::sync::broadcast;

use crate::websocket::messages::{RepeatMode, Song};

/// Channel capacity for the event hub
const EVENT_CAPACITY: usize = 256;

/// Notification emitted by the host player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Song, pause flag or elapsed time changed
    PlaybackChanged(Song),

    /// Volume changed (0 - 100)
    VolumeChanged(i64),

    RepeatChanged(RepeatMode),

    ShuffleChanged(bool),

    /// Playback jumped to a position in seconds
    Seeked(f64),

    MuteChanged(bool),
}

/// Source of player notifications
pub trait EventSource: Send + Sync {
    /// Start receiving events; dropping the receiver unsubscribes
    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}

/// In-memory event hub the host publishes into
#[derive(Debug, Clone)]
pub struct PlayerEvents {
    sender: broadcast::Sender<PlayerEvent>,
}

impl PlayerEvents {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of subscribers that received it. Events emitted
    /// with no subscriber are discarded.
    pub fn emit(&self, event: PlayerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for PlayerEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for PlayerEvents {
    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.sender.subscribe()
    }
}
