//! Mock player control for relay integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use resonance_relay::{ControlError, PlayerControl};

/// A control call as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    Play,
    Pause,
    Next,
    Previous,
    ToggleShuffle,
    ToggleMute,
    SetVolume(u8),
    SeekTo(f64),
    AdvanceRepeat,
}

/// Records every control call
///
/// Can be switched to fail every call, or to stall each call for a fixed
/// delay to exercise the command timeout.
#[derive(Default)]
pub struct MockPlayerControl {
    calls: Mutex<Vec<ControlCall>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MockPlayerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail
    pub fn failing() -> Self {
        let mock = Self::default();
        mock.set_failing(true);
        mock
    }

    /// Make every subsequent call block for `delay`
    pub fn stalling(delay: Duration) -> Self {
        let mock = Self::default();
        *mock.delay.lock().unwrap() = Some(delay);
        mock
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: ControlCall) -> Result<(), ControlError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        self.calls.lock().unwrap().push(call);

        if self.fail.load(Ordering::SeqCst) {
            Err(ControlError::Rejected("mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PlayerControl for MockPlayerControl {
    fn play(&self) -> Result<(), ControlError> {
        self.record(ControlCall::Play)
    }

    fn pause(&self) -> Result<(), ControlError> {
        self.record(ControlCall::Pause)
    }

    fn next(&self) -> Result<(), ControlError> {
        self.record(ControlCall::Next)
    }

    fn previous(&self) -> Result<(), ControlError> {
        self.record(ControlCall::Previous)
    }

    fn toggle_shuffle(&self) -> Result<(), ControlError> {
        self.record(ControlCall::ToggleShuffle)
    }

    fn toggle_mute(&self) -> Result<(), ControlError> {
        self.record(ControlCall::ToggleMute)
    }

    fn set_volume(&self, volume: u8) -> Result<(), ControlError> {
        self.record(ControlCall::SetVolume(volume))
    }

    fn seek_to(&self, seconds: f64) -> Result<(), ControlError> {
        self.record(ControlCall::SeekTo(seconds))
    }

    fn advance_repeat(&self) -> Result<(), ControlError> {
        self.record(ControlCall::AdvanceRepeat)
    }
}
