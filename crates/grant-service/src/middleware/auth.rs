//! Header-based tenant authentication for protected routes.
//!
//! Extracts `x-app-id` / `x-app-secret`, verifies the pair against the
//! tenant store (constant-time comparison inside the store), and injects
//! the authenticated [`Tenant`] into request extensions for downstream
//! handlers.

use crate::errors::ApiError;
use crate::observability::metrics;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Extract a required header as a string.
fn required_header<'a>(req: &'a Request, name: &'static str) -> Result<&'a str, ApiError> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "ag.middleware.auth", header = name, "Missing auth header");
            ApiError::Unauthorized(format!("Missing {name} header"))
        })
}

/// Authentication middleware for tenant-scoped endpoints.
///
/// # Response
///
/// - Returns 401 Unauthorized when headers are missing or the pair does
///   not verify
/// - Continues to the handler with the [`Tenant`] in extensions otherwise
///
/// [`Tenant`]: crate::models::Tenant
#[instrument(skip_all, name = "ag.middleware.auth")]
pub async fn require_tenant_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let app_id = required_header(&req, "x-app-id")?;
    let app_secret = required_header(&req, "x-app-secret")?;

    let tenant = state
        .tenants
        .verify_secret(app_id, app_secret)
        .map_err(|e| {
            metrics::record_auth_failure();
            tracing::debug!(target: "ag.middleware.auth", "Tenant authentication failed");
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(tenant);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    // Credential verification is covered by the tenant store tests and the
    // REST integration tests; the middleware itself is exercised end-to-end
    // through the server harness.
}
