//! Switchboard signaling service binary.
//!
//! Binds the configured WebSocket address, runs the accept loop, and
//! drains connections on SIGINT with a bounded grace period.

#![warn(clippy::pedantic)]

use signal_service::config::Config;
use signal_service::server::SignalServer;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signal_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Switchboard signaling service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        heartbeat_interval_seconds = config.heartbeat_interval_seconds,
        "Configuration loaded successfully"
    );

    let server = SignalServer::new(config);
    let listener = server.bind().await.map_err(|e| {
        error!("Failed to bind signaling address: {}", e);
        e
    })?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    server.run(listener, shutdown).await;
    Ok(())
}
