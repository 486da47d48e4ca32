//! Canonical player-state store
//!
//! Holds the single authoritative [`PlayerState`]. All writes go through
//! one lock so readers only ever observe complete snapshots.

use std::sync::{Arc, RwLock};

use crate::websocket::messages::{PlayerSnapshot, RepeatMode, Song};

/// Highest volume the player accepts
pub const MAX_VOLUME: u8 = 100;

/// Current player state
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Current song, if the player has reported one
    pub song: Option<Song>,

    pub muted: bool,

    /// Volume level (0 - 100)
    pub volume: u8,

    pub shuffle: bool,

    pub repeat: RepeatMode,

    /// Playback position in seconds; follows the song's elapsed time
    /// unless an explicit seek set it
    pub position: f64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            song: None,
            muted: false,
            volume: MAX_VOLUME,
            shuffle: false,
            repeat: RepeatMode::None,
            position: 0.0,
        }
    }
}

impl PlayerState {
    /// Whether a song is loaded and not paused
    pub fn is_playing(&self) -> bool {
        self.song.as_ref().is_some_and(|song| !song.is_paused)
    }

    /// Build the wire representation of this state
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            song: self.song.clone(),
            is_playing: self.is_playing(),
            muted: self.muted,
            position: self.position,
            volume: self.volume,
            shuffle: self.shuffle,
            repeat: self.repeat,
        }
    }

    /// Copy of this state with `update` applied on top
    pub fn overlay(&self, update: &StateUpdate) -> PlayerState {
        let mut state = self.clone();
        state.apply(update);
        state
    }

    /// Merge the fields present in `update` into this state
    fn apply(&mut self, update: &StateUpdate) {
        if let Some(song) = &update.song {
            let mut song = song.clone();
            song.elapsed_seconds = clamp_seconds(song.elapsed_seconds);
            self.position = song.elapsed_seconds;
            self.song = Some(song);
        }

        if let Some(paused) = update.paused {
            if let Some(song) = self.song.as_mut() {
                song.is_paused = paused;
            }
        }

        if let Some(muted) = update.muted {
            self.muted = muted;
        }

        if let Some(volume) = update.volume {
            self.volume = clamp_volume(volume);
        }

        if let Some(shuffle) = update.shuffle {
            self.shuffle = shuffle;
        }

        if let Some(repeat) = update.repeat {
            self.repeat = repeat;
        }

        if let Some(position) = update.position {
            self.position = clamp_seconds(position);
        }
    }
}

/// Partial update to [`PlayerState`]; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    /// Replace the current song (also resets `position` to its elapsed time)
    pub song: Option<Song>,

    /// Set the pause flag of the current song; ignored when no song is known
    pub paused: Option<bool>,

    pub muted: Option<bool>,

    /// Raw volume; clamped to 0 - 100 when applied
    pub volume: Option<i64>,

    pub shuffle: Option<bool>,

    pub repeat: Option<RepeatMode>,

    /// Explicit position in seconds (seek)
    pub position: Option<f64>,
}

impl StateUpdate {
    pub fn song(song: Song) -> Self {
        Self {
            position: Some(song.elapsed_seconds),
            song: Some(song),
            ..Default::default()
        }
    }

    pub fn paused(paused: bool) -> Self {
        Self {
            paused: Some(paused),
            ..Default::default()
        }
    }

    pub fn muted(muted: bool) -> Self {
        Self {
            muted: Some(muted),
            ..Default::default()
        }
    }

    pub fn volume(volume: i64) -> Self {
        Self {
            volume: Some(volume),
            ..Default::default()
        }
    }

    pub fn shuffle(shuffle: bool) -> Self {
        Self {
            shuffle: Some(shuffle),
            ..Default::default()
        }
    }

    pub fn repeat(repeat: RepeatMode) -> Self {
        Self {
            repeat: Some(repeat),
            ..Default::default()
        }
    }

    pub fn position(position: f64) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold a newer update into this one, last write wins per field
    ///
    /// A newer song supersedes any older pause flag or position, since
    /// both describe the song it replaced.
    pub fn merge(&mut self, newer: StateUpdate) {
        if newer.song.is_some() {
            self.paused = None;
            self.position = None;
            self.song = newer.song;
        }
        if newer.paused.is_some() {
            self.paused = newer.paused;
        }
        if newer.muted.is_some() {
            self.muted = newer.muted;
        }
        if newer.volume.is_some() {
            self.volume = newer.volume;
        }
        if newer.shuffle.is_some() {
            self.shuffle = newer.shuffle;
        }
        if newer.repeat.is_some() {
            self.repeat = newer.repeat;
        }
        if newer.position.is_some() {
            self.position = newer.position;
        }
    }
}

/// Clamp a raw volume into the player's valid range
pub fn clamp_volume(volume: i64) -> u8 {
    volume.clamp(0, MAX_VOLUME as i64) as u8
}

fn clamp_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

/// Shared handle to the canonical player state
///
/// Cloning is cheap; all clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    state: Arc<RwLock<PlayerState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an initial volume
    pub fn with_volume(volume: u8) -> Self {
        let state = PlayerState {
            volume: volume.min(MAX_VOLUME),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Snapshot copy of the current state
    pub fn get(&self) -> PlayerState {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Apply `update` atomically and return the resulting state
    pub fn apply(&self, update: &StateUpdate) -> PlayerState {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.apply(update);
        state.clone()
    }

    /// Compute an update from the current state and apply it under the same lock
    ///
    /// Returns the update that was applied.
    pub fn apply_with<F>(&self, f: F) -> StateUpdate
    where
        F: FnOnce(&PlayerState) -> StateUpdate,
    {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let update = f(&state);
        state.apply(&update);
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(video_id: &str, elapsed: f64, paused: bool) -> Song {
        Song {
            video_id: video_id.to_string(),
            title: format!("Song {}", video_id),
            artist: "Artist".to_string(),
            is_paused: paused,
            elapsed_seconds: elapsed,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_state() {
        let store = StateStore::new();
        let state = store.get();

        assert!(state.song.is_none());
        assert!(!state.is_playing());
        assert_eq!(state.repeat, RepeatMode::None);
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn test_with_volume_clamps() {
        assert_eq!(StateStore::with_volume(35).get().volume, 35);
        assert_eq!(StateStore::with_volume(250).get().volume, 100);
    }

    #[test]
    fn test_apply_is_last_write_wins_per_field() {
        let store = StateStore::new();

        store.apply(&StateUpdate::volume(20));
        store.apply(&StateUpdate::shuffle(true));
        store.apply(&StateUpdate::volume(60));
        store.apply(&StateUpdate::repeat(RepeatMode::One));
        let state = store.apply(&StateUpdate::muted(true));

        assert_eq!(state.volume, 60);
        assert!(state.shuffle);
        assert_eq!(state.repeat, RepeatMode::One);
        assert!(state.muted);
        assert_eq!(store.get(), state);
    }

    #[test]
    fn test_volume_is_clamped() {
        let store = StateStore::new();

        assert_eq!(store.apply(&StateUpdate::volume(150)).volume, 100);
        assert_eq!(store.apply(&StateUpdate::volume(-5)).volume, 0);
    }

    #[test]
    fn test_song_drives_position_and_playing() {
        let store = StateStore::new();
        let state = store.apply(&StateUpdate::song(song("a", 12.0, false)));

        assert!(state.is_playing());
        assert_eq!(state.position, 12.0);
    }

    #[test]
    fn test_seek_overrides_position_until_next_tick() {
        let store = StateStore::new();
        store.apply(&StateUpdate::song(song("a", 12.0, false)));

        let state = store.apply(&StateUpdate::position(90.0));
        assert_eq!(state.position, 90.0);

        let state = store.apply(&StateUpdate::song(song("a", 91.0, false)));
        assert_eq!(state.position, 91.0);
    }

    #[test]
    fn test_position_never_negative() {
        let store = StateStore::new();

        assert_eq!(store.apply(&StateUpdate::position(-3.0)).position, 0.0);
        assert_eq!(store.apply(&StateUpdate::position(f64::NAN)).position, 0.0);
        assert_eq!(
            store
                .apply(&StateUpdate::song(song("a", -1.0, false)))
                .position,
            0.0
        );
    }

    #[test]
    fn test_paused_applies_to_current_song() {
        let store = StateStore::new();

        // No song yet: nothing to pause
        let state = store.apply(&StateUpdate::paused(false));
        assert!(state.song.is_none());
        assert!(!state.is_playing());

        store.apply(&StateUpdate::song(song("a", 0.0, true)));
        let state = store.apply(&StateUpdate::paused(false));
        assert!(state.is_playing());
    }

    #[test]
    fn test_apply_with_reads_current_state() {
        let store = StateStore::new();

        let update = store.apply_with(|state| StateUpdate::shuffle(!state.shuffle));
        assert_eq!(update, StateUpdate::shuffle(true));
        assert!(store.get().shuffle);

        store.apply_with(|state| StateUpdate::shuffle(!state.shuffle));
        assert!(!store.get().shuffle);
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut pending = StateUpdate::volume(10);
        pending.merge(StateUpdate::shuffle(true));
        pending.merge(StateUpdate::volume(30));

        assert_eq!(pending.volume, Some(30));
        assert_eq!(pending.shuffle, Some(true));
        assert!(pending.repeat.is_none());
    }

    #[test]
    fn test_merge_new_song_supersedes_position_and_pause() {
        let mut pending = StateUpdate::position(50.0);
        pending.merge(StateUpdate::paused(true));
        pending.merge(StateUpdate::song(song("b", 3.0, false)));

        assert!(pending.paused.is_none());
        assert_eq!(pending.position, Some(3.0));
        assert_eq!(pending.song.as_ref().map(|s| s.video_id.as_str()), Some("b"));
    }

    #[test]
    fn test_overlay_does_not_mutate() {
        let store = StateStore::new();
        let base = store.get();

        let overlaid = base.overlay(&StateUpdate::volume(5));
        assert_eq!(overlaid.volume, 5);
        assert_eq!(store.get().volume, 100);
    }

    #[test]
    fn test_empty_update() {
        assert!(StateUpdate::default().is_empty());
        assert!(!StateUpdate::muted(false).is_empty());
    }
}
