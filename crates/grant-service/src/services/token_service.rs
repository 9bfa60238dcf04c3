//! Grant issuance.
//!
//! Validates the request, enforces room ownership, assembles the claim
//! set, and signs the compact token. Verification lives in
//! `common::grant` next to the envelope so the signaling plane shares it.

use crate::errors::ApiError;
use crate::models::{IssueTokenRequest, Tenant, TokenResponse};
use crate::observability::metrics;
use crate::repositories::RoomStore;
use common::grant::{parse_ttl, sign_grant, GrantClaims, Role, MAX_USER_ID_CHARS};
use common::secret::{ExposeSecret, SecretString};
use chrono::{TimeZone, Utc};
use tracing::{debug, info, warn};

/// Issue a signed grant for one user in one room.
///
/// Preconditions: the caller is already authenticated as `tenant` (the
/// auth middleware ran); the room must exist and belong to that tenant.
///
/// # Errors
///
/// - [`ApiError::Validation`] — empty or oversized `userId`, unknown role,
///   malformed `expiresIn`
/// - [`ApiError::NotFound`] — the room does not exist
/// - [`ApiError::Forbidden`] — the room belongs to another tenant
/// - [`ApiError::Internal`] — signing failure or expiry out of range
pub fn issue_room_token(
    rooms: &dyn RoomStore,
    signing_secret: &SecretString,
    tenant: &Tenant,
    room_id: &str,
    request: &IssueTokenRequest,
    default_ttl_seconds: i64,
) -> Result<TokenResponse, ApiError> {
    if request.user_id.is_empty() || request.user_id.chars().count() > MAX_USER_ID_CHARS {
        return Err(ApiError::Validation(format!(
            "userId must be 1-{MAX_USER_ID_CHARS} characters"
        )));
    }

    let role: Role = request.role.parse().map_err(|_| {
        debug!(target: "ag.services.tokens", role = %request.role, "Unknown role");
        ApiError::Validation("role must be one of host, participant, viewer".to_string())
    })?;

    let ttl_seconds = match &request.expires_in {
        Some(raw) => parse_ttl(raw).map_err(|_| {
            ApiError::Validation("expiresIn must be an integer followed by s, m, h or d".to_string())
        })?,
        None => default_ttl_seconds,
    };

    let room = rooms
        .get(room_id)
        .ok_or_else(|| ApiError::NotFound("room does not exist".to_string()))?;

    if room.tenant_id != tenant.id {
        warn!(
            target: "ag.services.tokens",
            tenant_id = %tenant.id,
            room_id = %room.id,
            "Token requested for another tenant's room"
        );
        return Err(ApiError::Forbidden(
            "room belongs to a different application".to_string(),
        ));
    }

    let now = Utc::now().timestamp();
    let claims = GrantClaims::new(
        tenant.id.clone(),
        room.id.clone(),
        request.user_id.clone(),
        role,
        now,
        ttl_seconds,
    );

    let token = {
        let secret = signing_secret.expose_secret();
        sign_grant(&claims, secret.as_bytes())
    }
    .map_err(|e| ApiError::Internal(format!("grant signing failed: {e}")))?;

    let expires_at = Utc
        .timestamp_opt(claims.exp, 0)
        .single()
        .ok_or_else(|| ApiError::Internal("grant expiry out of range".to_string()))?;

    info!(
        target: "ag.services.tokens",
        tenant_id = %tenant.id,
        room_id = %room.id,
        jti = %claims.jti,
        role = %role,
        ttl_seconds = ttl_seconds,
        "Grant issued"
    );
    metrics::record_token_issued(role.as_str());

    Ok(TokenResponse { token, expires_at })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryRoomStore, RoomStore};
    use common::grant::{verify_grant, GrantError};

    const SECRET: &str = "test-signing-secret-0123456789abcdef";

    fn tenant() -> Tenant {
        Tenant {
            id: "app-1".to_string(),
            name: "demo".to_string(),
            secret: "s".to_string(),
            created_at: Utc::now(),
        }
    }

    fn request(user_id: &str, role: &str, expires_in: Option<&str>) -> IssueTokenRequest {
        IssueTokenRequest {
            user_id: user_id.to_string(),
            role: role.to_string(),
            expires_in: expires_in.map(ToString::to_string),
        }
    }

    fn issue(
        rooms: &InMemoryRoomStore,
        room_id: &str,
        request: &IssueTokenRequest,
    ) -> Result<TokenResponse, ApiError> {
        issue_room_token(
            rooms,
            &SecretString::from(SECRET),
            &tenant(),
            room_id,
            request,
            3600,
        )
    }

    #[test]
    fn test_issued_token_verifies_with_same_claims() {
        let rooms = InMemoryRoomStore::new();
        let room = rooms.create("app-1", "standup", 2);

        let response = issue(&rooms, &room.id, &request("alice", "host", None)).unwrap();

        let claims = verify_grant(&response.token, SECRET.as_bytes()).unwrap();
        assert_eq!(claims.app_id, "app-1");
        assert_eq!(claims.room_id, room.id);
        assert_eq!(claims.user_id, "alice");
        assert_eq!(claims.role, Role::Host);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(response.expires_at.timestamp(), claims.exp);
    }

    #[test]
    fn test_explicit_ttl_overrides_default() {
        let rooms = InMemoryRoomStore::new();
        let room = rooms.create("app-1", "standup", 2);

        let response =
            issue(&rooms, &room.id, &request("alice", "viewer", Some("30m"))).unwrap();
        let claims = verify_grant(&response.token, SECRET.as_bytes()).unwrap();
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let rooms = InMemoryRoomStore::new();
        let room = rooms.create("app-1", "standup", 2);

        let err = issue(&rooms, &room.id, &request("", "host", None)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_oversized_user_id_rejected() {
        let rooms = InMemoryRoomStore::new();
        let room = rooms.create("app-1", "standup", 2);

        let long = "u".repeat(MAX_USER_ID_CHARS + 1);
        let err = issue(&rooms, &room.id, &request(&long, "host", None)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let rooms = InMemoryRoomStore::new();
        let room = rooms.create("app-1", "standup", 2);

        let err = issue(&rooms, &room.id, &request("alice", "moderator", None)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_malformed_expires_in_rejected() {
        let rooms = InMemoryRoomStore::new();
        let room = rooms.create("app-1", "standup", 2);

        let err = issue(&rooms, &room.id, &request("alice", "host", Some("soon"))).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_unknown_room_is_not_found() {
        let rooms = InMemoryRoomStore::new();
        let err = issue(&rooms, "missing", &request("alice", "host", None)).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_other_tenants_room_is_forbidden() {
        let rooms = InMemoryRoomStore::new();
        let room = rooms.create("app-2", "theirs", 2);

        let err = issue(&rooms, &room.id, &request("alice", "host", None)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_short_ttl_grant_expires() {
        let rooms = InMemoryRoomStore::new();
        let room = rooms.create("app-1", "standup", 2);

        let response = issue(&rooms, &room.id, &request("alice", "host", Some("1s"))).unwrap();

        // Deterministic expiry check: two seconds past issuance the grant
        // must verify as expired.
        let claims = verify_grant(&response.token, SECRET.as_bytes()).unwrap();
        assert_eq!(
            common::grant::verify_grant_at(&response.token, SECRET.as_bytes(), claims.iat + 2),
            Err(GrantError::Expired)
        );
    }
}
