//! Interfaces to the host media player
//!
//! The relay never talks to a playback engine directly. Hosts provide a
//! [`PlayerControl`] implementation for outbound commands and feed
//! [`PlayerEvent`]s through an [`EventSource`].

pub mod control;
pub mod events;

pub use control::{ControlError, LoggingControl, PlayerControl};
pub use events::{EventSource, PlayerEvent, PlayerEvents};
