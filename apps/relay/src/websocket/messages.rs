//! WebSocket message types for player-state relay
//!
//! This module defines the message protocol for client-server communication
//! over WebSocket connections. Messages are serialized as JSON objects tagged
//! by a `type` field.

use serde::{Deserialize, Serialize};

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Request a player-control action
    Action(ActionRequest),
}

/// Body of an `ACTION` message
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    /// Which action to perform
    pub action: ActionKind,

    /// Action argument (repeat mode string, seek target, volume)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Actions a client may request
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Play,
    Pause,
    Next,
    Previous,
    Shuffle,
    Mute,
    Repeat,
    Seek,
    SetVolume,
    GetVolume,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActionKind::Play => "play",
            ActionKind::Pause => "pause",
            ActionKind::Next => "next",
            ActionKind::Previous => "previous",
            ActionKind::Shuffle => "shuffle",
            ActionKind::Mute => "mute",
            ActionKind::Repeat => "repeat",
            ActionKind::Seek => "seek",
            ActionKind::SetVolume => "setVolume",
            ActionKind::GetVolume => "getVolume",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Full player state; sent on connect, after commands and on broadcasts
    PlayerState(PlayerSnapshot),
}

// =============================================================================
// Payload Types
// =============================================================================

/// Point-in-time copy of the player state as clients see it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Current song (null before the player reports one)
    pub song: Option<Song>,

    /// True when a song is loaded and not paused
    pub is_playing: bool,

    /// Whether audio is muted
    pub muted: bool,

    /// Playback position in seconds
    pub position: f64,

    /// Volume level (0 - 100)
    pub volume: u8,

    /// Shuffle mode enabled
    pub shuffle: bool,

    /// Repeat mode
    pub repeat: RepeatMode,
}

/// Song descriptor reported by the player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Player-assigned track identifier
    pub video_id: String,

    pub title: String,

    pub artist: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    /// Artwork URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,

    /// Track length in seconds
    #[serde(default)]
    pub song_duration: f64,

    /// Whether playback of this song is paused
    pub is_paused: bool,

    /// Seconds elapsed in this song
    pub elapsed_seconds: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Repeat mode options
///
/// The player cycles through the modes in declaration order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RepeatMode {
    #[default]
    None,
    All,
    One,
}

impl RepeatMode {
    /// Modes in the order the player advances through them
    pub const CYCLE: [RepeatMode; 3] = [RepeatMode::None, RepeatMode::All, RepeatMode::One];

    /// Position of this mode in [`RepeatMode::CYCLE`]
    pub fn index(self) -> usize {
        match self {
            RepeatMode::None => 0,
            RepeatMode::All => 1,
            RepeatMode::One => 2,
        }
    }

    /// The mode one advance away
    pub fn next(self) -> RepeatMode {
        Self::CYCLE[(self.index() + 1) % Self::CYCLE.len()]
    }

    /// Number of single-step advances needed to move from `self` to `target`
    ///
    /// Always the minimal forward rotation, so the result is 0, 1 or 2.
    pub fn steps_to(self, target: RepeatMode) -> u8 {
        let count = Self::CYCLE.len();
        ((target.index() + count - self.index()) % count) as u8
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatMode::None => write!(f, "NONE"),
            RepeatMode::All => write!(f, "ALL"),
            RepeatMode::One => write!(f, "ONE"),
        }
    }
}

impl std::str::FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(RepeatMode::None),
            "ALL" => Ok(RepeatMode::All),
            "ONE" => Ok(RepeatMode::One),
            other => Err(format!("unknown repeat mode '{}'", other)),
        }
    }
}
