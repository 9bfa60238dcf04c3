//! Room handlers. All routes here run behind tenant authentication.
//!
//! - `POST /rooms` - Create a room owned by the calling tenant
//! - `GET /rooms` - List the calling tenant's rooms
//! - `GET /rooms/:roomId` - Fetch one room, tenant-scoped

use crate::errors::ApiError;
use crate::models::{
    CreateRoomRequest, RoomResponse, Tenant, DEFAULT_MAX_PARTICIPANTS, MAX_NAME_CHARS,
    MAX_PARTICIPANTS, MIN_PARTICIPANTS,
};
use crate::observability::metrics;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /rooms
///
/// # Response
///
/// - 201 Created with `{id, appId, name, maxParticipants, createdAt}`
/// - 400 Bad Request on a malformed body, name, or capacity
#[instrument(skip_all, name = "ag.rooms.create", fields(endpoint = "/rooms"))]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<Tenant>,
    body: Bytes,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let request: CreateRoomRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "ag.handlers.rooms", error = %e, "Invalid request body");
        ApiError::Validation("Invalid request body".to_string())
    })?;

    let name = request.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::Validation(format!(
            "name must be 1-{MAX_NAME_CHARS} characters"
        )));
    }

    let max_participants = request
        .max_participants
        .unwrap_or(DEFAULT_MAX_PARTICIPANTS);
    if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&max_participants) {
        return Err(ApiError::Validation(format!(
            "maxParticipants must be between {MIN_PARTICIPANTS} and {MAX_PARTICIPANTS}"
        )));
    }

    let room = state.rooms.create(&tenant.id, name, max_participants);
    metrics::record_room_created();
    Ok((StatusCode::CREATED, Json(RoomResponse::from(&room))))
}

/// Handler for GET /rooms
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<Tenant>,
) -> Json<Vec<RoomResponse>> {
    let rooms = state
        .rooms
        .list_for_tenant(&tenant.id)
        .iter()
        .map(RoomResponse::from)
        .collect();
    Json(rooms)
}

/// Handler for GET /rooms/:roomId
///
/// # Response
///
/// - 200 OK with the room
/// - 403 Forbidden when the room belongs to another tenant
/// - 404 Not Found when no such room exists
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<Tenant>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state
        .rooms
        .get(&room_id)
        .ok_or_else(|| ApiError::NotFound("room does not exist".to_string()))?;

    if room.tenant_id != tenant.id {
        return Err(ApiError::Forbidden(
            "room belongs to a different application".to_string(),
        ));
    }

    Ok(Json(RoomResponse::from(&room)))
}
