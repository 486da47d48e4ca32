//! WebSocket client wrapper for relay integration tests

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use resonance_relay::websocket::{PlayerSnapshot, ServerMessage};

/// How long to wait for an expected message
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A connected test client
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect and consume the initial state snapshot
    pub async fn connect(url: &str) -> (Self, PlayerSnapshot) {
        let mut client = Self::connect_raw(url).await;
        let initial = client.next_state().await;
        (client, initial)
    }

    /// Connect without reading anything
    pub async fn connect_raw(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.expect("client should connect");
        Self { ws }
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .expect("client send should succeed");
    }

    /// Send an `ACTION` message
    pub async fn send_action(&mut self, action: &str, data: Option<serde_json::Value>) {
        let mut message = serde_json::json!({ "type": "ACTION", "action": action });
        if let Some(data) = data {
            message["data"] = data;
        }
        self.send_text(&message.to_string()).await;
    }

    /// Wait for the next `PLAYER_STATE` message
    pub async fn next_state(&mut self) -> PlayerSnapshot {
        self.try_next_state(RECV_TIMEOUT)
            .await
            .expect("expected a PLAYER_STATE message")
    }

    /// Wait up to `timeout` for a `PLAYER_STATE` message
    pub async fn try_next_state(&mut self, timeout: Duration) -> Option<PlayerSnapshot> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next()).await.ok()??;
            match frame.ok()? {
                Message::Text(text) => {
                    let ServerMessage::PlayerState(state) =
                        serde_json::from_str::<ServerMessage>(&text)
                            .expect("server sent invalid JSON");
                    return Some(state);
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Read the next raw text frame
    pub async fn next_text(&mut self) -> String {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return text;
            }
        }
    }

    /// True when nothing arrives within `window`
    pub async fn is_silent_for(&mut self, window: Duration) -> bool {
        self.try_next_state(window).await.is_none()
    }

    /// Whether the server closes the connection within `timeout`
    pub async fn is_closed_within(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
