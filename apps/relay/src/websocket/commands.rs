//! Client command routing
//!
//! Each inbound text frame goes through parse, validate, dispatch and
//! re-broadcast. Anything that fails along the way is dropped without a
//! reply; the error is returned for the caller to log.
//!
//! Commands run one at a time across all connections, so a command that
//! reads the store to plan its control calls never interleaves with
//! another command's calls.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;

use super::messages::{ActionKind, ActionRequest, ClientMessage, RepeatMode};
use crate::broadcaster::Broadcaster;
use crate::player::{ControlError, PlayerControl};
use crate::state::{clamp_volume, StateStore, StateUpdate};

/// Default upper bound on a single control-interface call
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// A validated client command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Next,
    Previous,
    ToggleShuffle,
    ToggleMute,
    SetRepeat(RepeatMode),
    /// Absolute target position in seconds
    Seek(f64),
    SetVolume(u8),
    GetVolume,
}

impl TryFrom<ActionRequest> for Command {
    type Error = CommandError;

    fn try_from(request: ActionRequest) -> Result<Self, Self::Error> {
        let action = request.action;
        let command = match action {
            ActionKind::Play => Command::Play,
            ActionKind::Pause => Command::Pause,
            ActionKind::Next => Command::Next,
            ActionKind::Previous => Command::Previous,
            ActionKind::Shuffle => Command::ToggleShuffle,
            ActionKind::Mute => Command::ToggleMute,
            ActionKind::GetVolume => Command::GetVolume,
            ActionKind::Repeat => {
                let data = request.data.ok_or(CommandError::MissingData(action))?;
                let mode = data
                    .as_str()
                    .ok_or_else(|| CommandError::invalid(action, "expected a repeat mode string"))?
                    .parse::<RepeatMode>()
                    .map_err(|e| CommandError::invalid(action, e))?;
                Command::SetRepeat(mode)
            }
            ActionKind::Seek => {
                let target = number(action, request.data)?;
                Command::Seek(target.max(0.0))
            }
            ActionKind::SetVolume => {
                let volume = number(action, request.data)?;
                Command::SetVolume(clamp_volume(volume.round() as i64))
            }
        };
        Ok(command)
    }
}

fn number(action: ActionKind, data: Option<serde_json::Value>) -> Result<f64, CommandError> {
    let data = data.ok_or(CommandError::MissingData(action))?;
    data.as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CommandError::invalid(action, "expected a number"))
}

/// Parse and validate one inbound text frame
pub fn parse_command(text: &str) -> Result<Command, CommandError> {
    let ClientMessage::Action(request) = serde_json::from_str::<ClientMessage>(text)?;
    Command::try_from(request)
}

/// Routes validated commands to the player and re-broadcasts the result
#[derive(Clone)]
pub struct CommandRouter {
    control: Arc<dyn PlayerControl>,
    store: StateStore,
    broadcaster: Broadcaster,
    timeout: Duration,
    /// Held from the first store read to the last commit of a command
    serial: Arc<Mutex<()>>,
}

impl CommandRouter {
    pub fn new(
        control: Arc<dyn PlayerControl>,
        store: StateStore,
        broadcaster: Broadcaster,
        timeout: Duration,
    ) -> Self {
        Self {
            control,
            store,
            broadcaster,
            timeout,
            serial: Arc::new(Mutex::new(())),
        }
    }

    /// Handle one inbound text frame end to end
    pub async fn handle_text(&self, text: &str) -> Result<Command, CommandError> {
        let command = parse_command(text)?;
        self.execute(command.clone()).await?;
        Ok(command)
    }

    /// Dispatch a validated command, then update state and broadcast
    ///
    /// State is only touched after the control call succeeds, and always
    /// before the broadcast goes out.
    pub async fn execute(&self, command: Command) -> Result<(), CommandError> {
        let _serial = self.serial.lock().await;

        match command {
            Command::Play => {
                self.dispatch("play", |c| c.play()).await?;
                self.commit(StateUpdate::paused(false));
            }
            Command::Pause => {
                self.dispatch("pause", |c| c.pause()).await?;
                self.commit(StateUpdate::paused(true));
            }
            Command::Next => {
                self.dispatch("next", |c| c.next()).await?;
                self.commit(StateUpdate::default());
            }
            Command::Previous => {
                self.dispatch("previous", |c| c.previous()).await?;
                self.commit(StateUpdate::default());
            }
            Command::ToggleShuffle => {
                self.dispatch("toggle_shuffle", |c| c.toggle_shuffle())
                    .await?;
                self.store
                    .apply_with(|state| StateUpdate::shuffle(!state.shuffle));
                self.broadcaster.broadcast_now(StateUpdate::default());
            }
            Command::ToggleMute => {
                self.dispatch("toggle_mute", |c| c.toggle_mute()).await?;
                self.store
                    .apply_with(|state| StateUpdate::muted(!state.muted));
                self.broadcaster.broadcast_now(StateUpdate::default());
            }
            Command::SetRepeat(target) => self.set_repeat(target).await?,
            Command::Seek(seconds) => {
                self.dispatch("seek_to", move |c| c.seek_to(seconds)).await?;
                self.commit(StateUpdate::position(seconds));
            }
            Command::SetVolume(volume) => {
                self.dispatch("set_volume", move |c| c.set_volume(volume))
                    .await?;
                self.commit(StateUpdate::volume(volume as i64));
            }
            Command::GetVolume => {
                tracing::debug!("getVolume requested; no reply is defined");
            }
        }
        Ok(())
    }

    /// Step the player's repeat mode forward until it reaches `target`
    ///
    /// If a step fails, the mode reached so far is still committed so the
    /// store keeps matching the player.
    async fn set_repeat(&self, target: RepeatMode) -> Result<(), CommandError> {
        let current = self.store.get().repeat;
        let mut reached = current;
        let mut result = Ok(());

        for _ in 0..current.steps_to(target) {
            if let Err(e) = self.dispatch("advance_repeat", |c| c.advance_repeat()).await {
                result = Err(e);
                break;
            }
            reached = reached.next();
        }

        if result.is_ok() || reached != current {
            if reached != target {
                tracing::warn!(
                    requested = %target,
                    reached = %reached,
                    "Repeat mode only partially advanced"
                );
            }
            self.commit(StateUpdate::repeat(reached));
        }
        result
    }

    /// Store the command's result and broadcast it without debouncing
    fn commit(&self, update: StateUpdate) {
        self.store.apply(&update);
        self.broadcaster.broadcast_now(StateUpdate::default());
    }

    /// Run a control call on the blocking pool, bounded by the command timeout
    async fn dispatch<F>(&self, operation: &'static str, call: F) -> Result<(), CommandError>
    where
        F: FnOnce(&dyn PlayerControl) -> Result<(), ControlError> + Send + 'static,
    {
        let control = Arc::clone(&self.control);
        let task = tokio::task::spawn_blocking(move || call(control.as_ref()));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(source))) => Err(CommandError::Control { operation, source }),
            Ok(Err(e)) => Err(CommandError::TaskFailed(e.to_string())),
            Err(_) => Err(CommandError::Timeout {
                operation,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// Errors that cause a command to be dropped
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing data for action '{0}'")]
    MissingData(ActionKind),

    #[error("invalid data for action '{action}': {reason}")]
    InvalidData { action: ActionKind, reason: String },

    #[error("player control '{operation}' failed: {source}")]
    Control {
        operation: &'static str,
        #[source]
        source: ControlError,
    },

    #[error("player control '{operation}' timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("player control task failed: {0}")]
    TaskFailed(String),
}

impl CommandError {
    fn invalid(action: ActionKind, reason: impl ToString) -> Self {
        Self::InvalidData {
            action,
            reason: reason.to_string(),
        }
    }

    /// True when the client sent something unusable, as opposed to the
    /// player failing to carry out a valid command
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_) | Self::MissingData(_) | Self::InvalidData { .. }
        )
    }
}
