//! WebSocket transport for remote players
//!
//! This module handles:
//! - The JSON message protocol
//! - Connection registration and fan-out
//! - Routing client actions to the player control interface

pub mod commands;
pub mod connection;
pub mod handler;
pub mod messages;

pub use commands::{Command, CommandError, CommandRouter, DEFAULT_COMMAND_TIMEOUT};
pub use connection::{ConnectionInfo, ConnectionManager};
pub use handler::{ws_handler, RelayContext};
pub use messages::{ActionKind, ClientMessage, PlayerSnapshot, RepeatMode, ServerMessage, Song};
