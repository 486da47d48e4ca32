//! Playback-control interface implemented by the host

use thiserror::Error;

/// Errors a host may report from a control call
#[derive(Error, Debug)]
pub enum ControlError {
    /// The player is not ready to take commands
    #[error("player unavailable: {0}")]
    Unavailable(String),

    /// The player refused the operation
    #[error("operation rejected: {0}")]
    Rejected(String),
}

/// Imperative playback operations exposed by the host player
///
/// Calls are expected to return quickly. The relay runs them on the
/// blocking pool under a timeout, so an implementation may block.
pub trait PlayerControl: Send + Sync + 'static {
    fn play(&self) -> Result<(), ControlError>;

    fn pause(&self) -> Result<(), ControlError>;

    fn next(&self) -> Result<(), ControlError>;

    fn previous(&self) -> Result<(), ControlError>;

    /// Flip shuffle on or off
    fn toggle_shuffle(&self) -> Result<(), ControlError>;

    /// Flip mute on or off
    fn toggle_mute(&self) -> Result<(), ControlError>;

    /// Set volume (0 - 100)
    fn set_volume(&self, volume: u8) -> Result<(), ControlError>;

    /// Seek to an absolute position in seconds
    fn seek_to(&self, seconds: f64) -> Result<(), ControlError>;

    /// Advance the repeat mode one step along NONE -> ALL -> ONE -> NONE
    fn advance_repeat(&self) -> Result<(), ControlError>;
}

/// Control implementation that only logs the calls it receives
///
/// Used by the standalone binary when no host player is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingControl;

impl LoggingControl {
    fn log(&self, operation: &str) -> Result<(), ControlError> {
        tracing::info!(operation, "Player control requested (no player attached)");
        Ok(())
    }
}

impl PlayerControl for LoggingControl {
    fn play(&self) -> Result<(), ControlError> {
        self.log("play")
    }

    fn pause(&self) -> Result<(), ControlError> {
        self.log("pause")
    }

    fn next(&self) -> Result<(), ControlError> {
        self.log("next")
    }

    fn previous(&self) -> Result<(), ControlError> {
        self.log("previous")
    }

    fn toggle_shuffle(&self) -> Result<(), ControlError> {
        self.log("toggle_shuffle")
    }

    fn toggle_mute(&self) -> Result<(), ControlError> {
        self.log("toggle_mute")
    }

    fn set_volume(&self, volume: u8) -> Result<(), ControlError> {
        tracing::info!(volume, "Player control requested (no player attached)");
        Ok(())
    }

    fn seek_to(&self, seconds: f64) -> Result<(), ControlError> {
        tracing::info!(seconds, "Player control requested (no player attached)");
        Ok(())
    }

    fn advance_repeat(&self) -> Result<(), ControlError> {
        self.log("advance_repeat")
    }
}
