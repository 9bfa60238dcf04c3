//! Application (tenant) handlers.
//!
//! - `POST /apps` - Register an application; the secret appears only here
//! - `GET /apps` - List registered applications without secrets

use crate::errors::ApiError;
use crate::models::{AppCreatedResponse, AppSummary, CreateAppRequest, MAX_NAME_CHARS};
use crate::observability::metrics;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /apps
///
/// # Response
///
/// - 201 Created with `{id, name, secret, createdAt}`
/// - 400 Bad Request on a malformed body or name
#[instrument(skip_all, name = "ag.apps.create", fields(endpoint = "/apps"))]
pub async fn create_app(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<AppCreatedResponse>), ApiError> {
    // Deserialize manually so malformed JSON is a 400, not axum's 422.
    let request: CreateAppRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "ag.handlers.apps", error = %e, "Invalid request body");
        ApiError::Validation("Invalid request body".to_string())
    })?;

    let name = request.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::Validation(format!(
            "name must be 1-{MAX_NAME_CHARS} characters"
        )));
    }

    let tenant = state.tenants.create(name);
    metrics::record_app_created();
    Ok((StatusCode::CREATED, Json(AppCreatedResponse::from(&tenant))))
}

/// Handler for GET /apps
pub async fn list_apps(State(state): State<Arc<AppState>>) -> Json<Vec<AppSummary>> {
    let apps = state
        .tenants
        .list()
        .iter()
        .map(AppSummary::from)
        .collect();
    Json(apps)
}
