//! Relay server lifecycle
//!
//! [`RelayServer::start`] binds the listener and wires the state store,
//! broadcaster, command router and event bridge together.
//! [`RelayServer::shutdown`] tears them down in reverse: stop accepting,
//! cancel the pending broadcast, unsubscribe from player events, close
//! every client and release the socket.
//! [`RelayServer::reconfigure`] moves the listener to a new address while
//! the store, broadcaster and bridge keep running.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{Extension, Router};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::bridge::{BridgeHandle, EventBridge};
use crate::broadcaster::Broadcaster;
use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::player::{EventSource, PlayerControl};
use crate::state::StateStore;
use crate::websocket::{ws_handler, CommandRouter, ConnectionManager, RelayContext};

/// How long shutdown waits for the listener task to exit
const SERVE_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between sweeps for connections whose writer has gone away
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// The accept loop currently serving clients
struct Listener {
    config: RelayConfig,
    /// Child of the relay's shutdown token
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// A running relay
pub struct RelayServer {
    local_addr: RwLock<SocketAddr>,
    store: StateStore,
    connections: ConnectionManager,
    broadcaster: Broadcaster,
    ctx: RelayContext,
    shutdown: CancellationToken,
    listener: Mutex<Option<Listener>>,
    bridge: Mutex<Option<BridgeHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer").finish_non_exhaustive()
    }
}

impl RelayServer {
    /// Bind the listener and start serving
    ///
    /// A bind failure is returned to the caller; nothing is left running.
    pub async fn start(
        config: &RelayConfig,
        control: Arc<dyn PlayerControl>,
        events: &dyn EventSource,
    ) -> RelayResult<Self> {
        config.validate()?;

        let tcp = bind(config).await?;
        let local_addr = tcp.local_addr()?;

        let store = StateStore::with_volume(config.volume);
        let connections = ConnectionManager::new();
        let broadcaster = Broadcaster::new(store.clone(), connections.clone(), config.debounce());
        let commands = CommandRouter::new(
            control,
            store.clone(),
            broadcaster.clone(),
            config.command_timeout(),
        );
        let shutdown = CancellationToken::new();

        let bridge = EventBridge::new(store.clone(), broadcaster.clone()).start(events);

        let ctx = RelayContext {
            connections: connections.clone(),
            broadcaster: broadcaster.clone(),
            commands,
            shutdown: shutdown.clone(),
        };
        let listener = serve(tcp, config.clone(), &ctx);

        let sweep_task = tokio::spawn(sweep_closed(connections.clone(), shutdown.clone()));

        tracing::info!(
            address = %local_addr,
            environment = %config.environment,
            "Relay listening"
        );

        Ok(Self {
            local_addr: RwLock::new(local_addr),
            store,
            connections,
            broadcaster,
            ctx,
            shutdown,
            listener: Mutex::new(Some(listener)),
            bridge: Mutex::new(Some(bridge)),
            tasks: Mutex::new(vec![sweep_task]),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        *self.local_addr.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a new configuration to the running relay
    ///
    /// When the host name or port changed, the new address is bound first;
    /// if that fails the old listener keeps serving and the error is
    /// returned. Otherwise the old listener stops, its clients are closed
    /// and the new one takes over with the same player state. Other
    /// settings are recorded and take effect on the next start.
    ///
    /// Returns whether the listener moved.
    pub async fn reconfigure(&self, config: &RelayConfig) -> RelayResult<bool> {
        config.validate()?;

        let mut slot = self.listener.lock().await;
        let Some(current) = slot.as_mut() else {
            tracing::debug!("Ignoring reconfigure after shutdown");
            return Ok(false);
        };

        if !current.config.requires_rebind(config) {
            current.config = config.clone();
            return Ok(false);
        }

        let tcp = bind(config).await?;
        let local_addr = tcp.local_addr()?;

        if let Some(old) = slot.take() {
            old.token.cancel();
            let closed = self.connections.close_all();
            stop_task(old.task).await;
            tracing::info!(
                from = %old.config.server.address(),
                closed,
                "Relay listener stopped for rebind"
            );
        }

        *slot = Some(serve(tcp, config.clone(), &self.ctx));
        *self.local_addr.write().unwrap_or_else(|e| e.into_inner()) = local_addr;

        tracing::info!(address = %local_addr, "Relay listening");
        Ok(true)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop the relay
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::info!(address = %self.local_addr(), "Shutting down relay");

        // Stop accepting and tell every connection to close
        self.shutdown.cancel();
        self.broadcaster.shutdown();

        if let Some(mut bridge) = self.bridge.lock().await.take() {
            bridge.stop().await;
        }

        let closed = self.connections.close_all();

        if let Some(listener) = self.listener.lock().await.take() {
            stop_task(listener.task).await;
        }
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            stop_task(task).await;
        }

        tracing::info!(closed, "Relay stopped");
    }
}

/// Bind the configured address
async fn bind(config: &RelayConfig) -> RelayResult<TcpListener> {
    let address = config.server.address();
    let addr = config.socket_addr()?;

    TcpListener::bind(addr).await.map_err(|source| {
        tracing::error!(address = %address, error = %source, "Failed to bind relay listener");
        RelayError::Bind { address, source }
    })
}

/// Spawn the accept loop on `tcp` under a fresh child token
fn serve(tcp: TcpListener, config: RelayConfig, ctx: &RelayContext) -> Listener {
    let token = ctx.shutdown.child_token();
    let ctx = RelayContext {
        shutdown: token.clone(),
        ..ctx.clone()
    };

    let app = Router::new()
        .fallback(ws_handler)
        .layer(Extension(ctx))
        .layer(TraceLayer::new_for_http());

    let serve_token = token.clone();
    let task = tokio::spawn(async move {
        let result = axum::serve(tcp, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move { serve_token.cancelled().await })
            .await;

        if let Err(e) = result {
            tracing::error!(error = %e, "Relay listener failed");
        }
    });

    Listener {
        config,
        token,
        task,
    }
}

/// Wait for a cancelled task to exit, aborting it if it takes too long
async fn stop_task(mut task: JoinHandle<()>) {
    match tokio::time::timeout(SERVE_SHUTDOWN_TIMEOUT, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_cancelled() => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Relay task failed"),
        Err(_) => {
            tracing::warn!("Relay task did not stop in time, aborting");
            task.abort();
        }
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.broadcaster.shutdown();
    }
}

/// Periodically drop connections whose outbound channel has closed
async fn sweep_closed(connections: ConnectionManager, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let removed = connections.cleanup_closed();
                if removed > 0 {
                    tracing::debug!(removed, "Swept closed connections");
                }
            }
        }
    }
}
