//! WebSocket upgrade handler
//!
//! This module accepts WebSocket upgrades, registers each client with the
//! connection registry and pumps messages in both directions until the
//! client leaves or the relay shuts down.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Extension,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::commands::CommandRouter;
use super::connection::{ConnectionInfo, ConnectionManager};
use super::messages::ServerMessage;
use crate::broadcaster::Broadcaster;

/// Shared services handed to every connection
#[derive(Clone)]
pub struct RelayContext {
    pub connections: ConnectionManager,
    pub broadcaster: Broadcaster,
    pub commands: CommandRouter,
    /// Cancelled when the listener that accepted the connection stops
    pub shutdown: CancellationToken,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(ctx): Extension<RelayContext>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let info = ConnectionInfo::new(connect_info.map(|ConnectInfo(addr)| addr))
        .with_user_agent(user_agent);

    ws.on_upgrade(move |socket| handle_socket(socket, info, ctx))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, info: ConnectionInfo, ctx: RelayContext) {
    let connection_id = info.connection_id;
    let remote_addr = info
        .remote_addr
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if ctx.shutdown.is_cancelled() {
        tracing::debug!(connection_id = %connection_id, "Rejecting connection during shutdown");
        return;
    }

    // Create unbounded channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Register with the full current state as the first message
    if !ctx.broadcaster.register(info, tx) {
        return;
    }

    tracing::info!(
        connection_id = %connection_id,
        remote_addr = %remote_addr,
        connection_count = ctx.connections.connection_count(),
        "WebSocket client connected"
    );

    // Split the socket into sender and receiver
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Spawn task to forward messages from channel to WebSocket
    let shutdown = ctx.shutdown.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        // Removed from the registry
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    };
                    match serde_json::to_string(&msg) {
                        Ok(json) => {
                            if ws_sender.send(Message::Text(json)).await.is_err() {
                                tracing::debug!(connection_id = %connection_id, "WebSocket send failed");
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize message");
                        }
                    }
                }
            }
        }
    });

    // Handle incoming messages
    let connections = ctx.connections.clone();
    let commands = ctx.commands.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    connections.touch(connection_id);
                    match commands.handle_text(&text).await {
                        Ok(command) => {
                            tracing::debug!(
                                connection_id = %connection_id,
                                command = ?command,
                                "Command executed"
                            );
                        }
                        Err(e) if e.is_client_error() => {
                            tracing::debug!(
                                error = %e,
                                connection_id = %connection_id,
                                "Dropped client message"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                connection_id = %connection_id,
                                "Command failed"
                            );
                        }
                    }
                }
                Ok(Message::Binary(_)) => {
                    // Binary messages not supported by the protocol
                    tracing::debug!(connection_id = %connection_id, "Received unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pings are answered automatically by axum-ws
                    connections.touch(connection_id);
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "WebSocket close received");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, connection_id = %connection_id, "WebSocket error");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete, then abort the other
    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
            send_task.abort();
        }
    }

    // Clean up: remove connection
    ctx.connections.remove_connection(connection_id);

    tracing::info!(
        connection_id = %connection_id,
        remote_addr = %remote_addr,
        "WebSocket connection closed"
    );
}
