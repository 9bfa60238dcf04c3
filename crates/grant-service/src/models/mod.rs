//! Domain model and request/response types for the access plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length for tenant and room display names.
pub const MAX_NAME_CHARS: usize = 128;

/// Default room capacity when a creation request names none.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 2;

/// Smallest allowed room capacity.
pub const MIN_PARTICIPANTS: u32 = 1;

/// Largest allowed room capacity.
pub const MAX_PARTICIPANTS: u32 = 16;

/// A third-party application embedding the platform.
///
/// The secret is the tenant's bearer credential for server-to-server
/// calls; it is echoed exactly once, in the creation response.
#[derive(Clone, PartialEq)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

/// Custom Debug implementation that redacts the tenant secret.
impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A call container owned by exactly one tenant for its entire lifetime.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub max_participants: u32,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    pub max_participants: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    pub user_id: String,
    pub role: String,
    pub expires_in: Option<String>,
}

// ============================================================================
// Response bodies
// ============================================================================

/// Creation response: the only place the tenant secret appears.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCreatedResponse {
    pub id: String,
    pub name: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub id: String,
    pub app_id: String,
    pub name: String,
    pub max_participants: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Tenant> for AppCreatedResponse {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            name: tenant.name.clone(),
            secret: tenant.secret.clone(),
            created_at: tenant.created_at,
        }
    }
}

impl From<&Tenant> for AppSummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            name: tenant.name.clone(),
            created_at: tenant.created_at,
        }
    }
}

impl From<&Room> for RoomResponse {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            app_id: room.tenant_id.clone(),
            name: room.name.clone(),
            max_participants: room.max_participants,
            created_at: room.created_at,
        }
    }
}
