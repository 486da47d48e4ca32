//! Resonance relay library
//!
//! Keeps remote players in step with the desktop player: WebSocket clients
//! receive the full player state on connect and after every change, and
//! can drive playback through a small JSON action protocol.
//!
//! The host application supplies a [`PlayerControl`] implementation and an
//! [`EventSource`], then starts a [`RelayServer`] with a [`RelayConfig`].

pub mod bridge;
pub mod broadcaster;
pub mod config;
pub mod error;
pub mod player;
pub mod server;
pub mod state;
pub mod websocket;

// Re-export commonly used types
pub use bridge::{BridgeHandle, EventBridge};
pub use broadcaster::{Broadcaster, DEFAULT_DEBOUNCE};
pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use player::{ControlError, EventSource, LoggingControl, PlayerControl, PlayerEvent, PlayerEvents};
pub use server::RelayServer;
pub use state::{PlayerState, StateStore, StateUpdate};
