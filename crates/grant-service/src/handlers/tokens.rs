//! Grant issuance handler.
//!
//! - `POST /rooms/:roomId/token` - Mint a signed grant for one user

use crate::errors::ApiError;
use crate::models::{IssueTokenRequest, Tenant, TokenResponse};
use crate::routes::AppState;
use crate::services::token_service;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /rooms/:roomId/token
///
/// # Response
///
/// - 201 Created with `{token, expiresAt}`
/// - 400 Bad Request on a malformed body, userId, role, or expiresIn
/// - 403 Forbidden when the room belongs to another tenant
/// - 404 Not Found when no such room exists
#[instrument(
    skip_all,
    name = "ag.tokens.issue",
    fields(endpoint = "/rooms/:roomId/token")
)]
pub async fn issue_room_token(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<Tenant>,
    Path(room_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let request: IssueTokenRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "ag.handlers.tokens", error = %e, "Invalid request body");
        ApiError::Validation("Invalid request body".to_string())
    })?;

    let response = token_service::issue_room_token(
        state.rooms.as_ref(),
        &state.config.signing_secret,
        &tenant,
        &room_id,
        &request,
        state.config.default_ttl_seconds,
    )?;

    Ok((StatusCode::CREATED, Json(response)))
}
