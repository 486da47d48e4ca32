//! Test fixtures for relay integration tests

use std::sync::Arc;

use resonance_relay::websocket::Song;
use resonance_relay::{PlayerControl, PlayerEvents, RelayConfig, RelayServer};

use super::mocks::MockPlayerControl;

/// Loopback configuration on an ephemeral port
pub fn test_config() -> RelayConfig {
    RelayConfig::with_address("127.0.0.1", 0)
}

/// Song fixture with the given id, elapsed time and pause flag
pub fn song(video_id: &str, elapsed_seconds: f64, is_paused: bool) -> Song {
    Song {
        video_id: video_id.to_string(),
        title: format!("Track {video_id}"),
        artist: "Test Artist".to_string(),
        album: Some("Test Album".to_string()),
        song_duration: 240.0,
        is_paused,
        elapsed_seconds,
        ..Default::default()
    }
}

/// A running relay plus the collaborators it was started with
pub struct TestRelay {
    pub server: RelayServer,
    pub control: Arc<MockPlayerControl>,
    pub events: PlayerEvents,
}

impl TestRelay {
    /// Start a relay with a fresh mock control and event hub
    pub async fn start() -> Self {
        Self::start_with(test_config(), MockPlayerControl::new()).await
    }

    pub async fn start_with(config: RelayConfig, control: MockPlayerControl) -> Self {
        let control = Arc::new(control);
        let events = PlayerEvents::new();
        let server = RelayServer::start(
            &config,
            control.clone() as Arc<dyn PlayerControl>,
            &events,
        )
        .await
        .expect("relay should start");

        Self {
            server,
            control,
            events,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/", self.server.local_addr())
    }
}
