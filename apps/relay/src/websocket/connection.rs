//! WebSocket connection management
//!
//! This module tracks every live client connection and delivers
//! targeted and broadcast messages to them.

use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::ServerMessage;

/// Handle for sending messages to a specific WebSocket connection
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Channel for sending messages to this connection
    pub sender: mpsc::UnboundedSender<ServerMessage>,

    /// Connection information
    pub info: ConnectionInfo,

    /// When this connection was established (Unix timestamp ms)
    pub connected_at: i64,

    /// Last activity timestamp (atomic for thread-safe updates)
    pub last_activity: Arc<AtomicI64>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<ServerMessage>, info: ConnectionInfo) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            sender,
            info,
            connected_at: now,
            last_activity: Arc::new(AtomicI64::new(now)),
        }
    }

    /// Update last activity timestamp
    pub fn touch(&self) {
        self.last_activity
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Get last activity timestamp
    pub fn last_seen(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    /// Send a message to this connection
    #[allow(clippy::result_large_err)]
    pub fn send(&self, msg: ServerMessage) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.sender.send(msg)
    }

    /// Check if the connection is still alive
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Information about a connected client
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Server-assigned connection identifier
    pub connection_id: Uuid,

    /// Peer address, when the transport exposes it
    pub remote_addr: Option<SocketAddr>,

    /// User agent string (for debugging)
    pub user_agent: Option<String>,
}

impl ConnectionInfo {
    pub fn new(remote_addr: Option<SocketAddr>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            remote_addr,
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Registry of live client connections
///
/// Thread-safe structure for tracking connections across the relay.
/// Uses DashMap for concurrent access without explicit locking.
/// Wrapped in Arc for cheap cloning.
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    /// Map of connection_id -> ConnectionHandle
    connections: Arc<DashMap<Uuid, ConnectionHandle>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Register a connection, delivering `initial` to it first
    ///
    /// `initial` is queued before the connection becomes visible to
    /// broadcasts, so it is always the first message the client sees.
    /// Returns false (and registers nothing) if the channel is already closed.
    pub fn add_connection(
        &self,
        info: ConnectionInfo,
        sender: mpsc::UnboundedSender<ServerMessage>,
        initial: ServerMessage,
    ) -> bool {
        let connection_id = info.connection_id;
        let handle = ConnectionHandle::new(sender, info);

        if handle.send(initial).is_err() {
            tracing::debug!(connection_id = %connection_id, "Connection closed before registration");
            return false;
        }

        self.connections.insert(connection_id, handle);

        tracing::debug!(
            connection_id = %connection_id,
            connection_count = self.connections.len(),
            "Connection added"
        );

        true
    }

    /// Remove a connection
    pub fn remove_connection(&self, connection_id: Uuid) -> bool {
        let removed = self.connections.remove(&connection_id).is_some();

        if removed {
            tracing::debug!(
                connection_id = %connection_id,
                connection_count = self.connections.len(),
                "Connection removed"
            );
        }

        removed
    }

    /// Check if a connection is registered
    pub fn is_connected(&self, connection_id: Uuid) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Get the number of registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Update last activity timestamp for a connection (call when receiving messages)
    ///
    /// Returns true if the connection was found and updated, false otherwise.
    pub fn touch(&self, connection_id: Uuid) -> bool {
        if let Some(handle) = self.connections.get(&connection_id) {
            handle.touch();
            return true;
        }
        false
    }

    /// Last activity timestamp for a connection
    pub fn last_seen(&self, connection_id: Uuid) -> Option<i64> {
        self.connections.get(&connection_id).map(|h| h.last_seen())
    }

    /// Send a message to a specific connection
    ///
    /// Sending to a connection that is no longer registered is a no-op.
    /// A connection whose channel has closed is removed. Returns true if
    /// the message was queued.
    pub fn send_to(&self, connection_id: Uuid, msg: ServerMessage) -> bool {
        let delivered = match self.connections.get(&connection_id) {
            Some(handle) => handle.send(msg).is_ok(),
            None => return false,
        };

        if !delivered {
            tracing::debug!(connection_id = %connection_id, "Send failed, dropping connection");
            self.remove_connection(connection_id);
        }

        delivered
    }

    /// Send a message to every registered connection
    ///
    /// A failed send only affects that connection: it is removed and
    /// delivery continues to the rest. Returns the number of connections
    /// the message was queued for.
    pub fn broadcast(&self, msg: ServerMessage) -> usize {
        let mut sent = 0;
        let mut dead = Vec::new();

        for entry in self.connections.iter() {
            if entry.value().send(msg.clone()).is_ok() {
                sent += 1;
            } else {
                dead.push(*entry.key());
            }
        }

        for connection_id in dead {
            tracing::debug!(connection_id = %connection_id, "Broadcast failed, dropping connection");
            self.remove_connection(connection_id);
        }

        sent
    }

    /// Remove every connection
    ///
    /// Dropping the handles closes each outbound channel, which ends the
    /// connection's writer task. Returns the number of connections removed.
    pub fn close_all(&self) -> usize {
        let count = self.connections.len();
        self.connections.clear();

        if count > 0 {
            tracing::debug!(count, "Closed all connections");
        }

        count
    }

    /// Clean up connections whose outbound channel has closed
    pub fn cleanup_closed(&self) -> usize {
        let before = self.connections.len();
        self.connections.retain(|connection_id, handle| {
            let alive = handle.is_alive();
            if !alive {
                tracing::debug!(connection_id = %connection_id, "Removed closed connection");
            }
            alive
        });
        before.saturating_sub(self.connections.len())
    }
}
