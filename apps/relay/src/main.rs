//! Resonance relay server
//!
//! Standalone relay with a logging control interface. Useful for driving
//! client development without a desktop player attached.

use std::sync::Arc;

use anyhow::Context;
use resonance_relay::{LoggingControl, PlayerEvents, RelayConfig, RelayServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resonance_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = RelayConfig::from_env().context("Failed to load relay configuration")?;

    tracing::info!(
        "Starting Resonance relay on {}",
        config.server.address()
    );

    let events = PlayerEvents::new();
    let server = RelayServer::start(&config, Arc::new(LoggingControl), &events).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    server.shutdown().await;

    Ok(())
}
