//! Switchboard access plane binary.
//!
//! Serves the REST API for application registration, rooms, and grant
//! issuance, plus the Prometheus metrics endpoint.

#![warn(clippy::pedantic)]

use grant_service::config::Config;
use grant_service::routes::{build_routes, init_metrics_recorder, AppState};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grant_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Switchboard access plane");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        default_ttl_seconds = config.default_ttl_seconds,
        "Configuration loaded successfully"
    );

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState::new(config));
    let router = build_routes(state, Some(metrics_handle));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| {
            error!("Failed to bind API address: {}", e);
            e
        })?;
    info!(addr = %listener.local_addr()?, "Access plane listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Access plane stopped");
    Ok(())
}
