//! HTTP routes for the access plane.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::require_tenant_auth;
use crate::repositories::{InMemoryRoomStore, InMemoryTenantStore, RoomStore, TenantStore};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Tenant store.
    pub tenants: Arc<dyn TenantStore>,

    /// Room store.
    pub rooms: Arc<dyn RoomStore>,
}

impl AppState {
    /// Build state over the in-memory stores.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tenants: Arc::new(InMemoryTenantStore::new()),
            rooms: Arc::new(InMemoryRoomStore::new()),
        }
    }
}

/// Initialize the Prometheus metrics recorder and return the handle for
/// serving metrics via HTTP. Must be called before any metrics are
/// recorded, and only by the binary: libraries and tests record through
/// the facade without a recorder installed.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Build the application routes.
///
/// - `/health` - liveness probe, public
/// - `/metrics` - Prometheus endpoint, present when a handle is supplied
/// - `POST /apps`, `GET /apps` - public per the platform contract
/// - `/rooms`... - tenant authenticated via `x-app-id` / `x-app-secret`
/// - `TraceLayer` for request logging, 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: Option<PrometheusHandle>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/apps", post(handlers::create_app).get(handlers::list_apps))
        .with_state(Arc::clone(&state));

    let protected_routes = Router::new()
        .route(
            "/rooms",
            post(handlers::create_room).get(handlers::list_rooms),
        )
        .route("/rooms/:room_id", get(handlers::get_room))
        .route("/rooms/:room_id/token", post(handlers::issue_room_token))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_tenant_auth,
        ))
        .with_state(state);

    let mut router = public_routes.merge(protected_routes);

    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(handlers::metrics_handler))
                .with_state(handle),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
