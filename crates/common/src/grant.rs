//! The signed grant envelope shared by the access and signaling planes.
//!
//! A grant authorizes one user to participate in one room in one role for a
//! bounded time window. It is the only trust handoff between a tenant's
//! backend and the browser client, so it must verify statelessly (no store
//! lookup on the signaling hot path) while staying individually
//! identifiable through `jti` for a future revocation list.
//!
//! Format: compact `header.payload.signature` JWT, base64url without
//! padding, signed with HMAC-SHA256 under the shared signing secret.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (denial-of-service prevention)
//! - The verification algorithm is fixed at HS256; the token header's
//!   `alg` field is never trusted
//! - A grant is valid iff the signature verifies, claims are well-formed,
//!   and `iat <= now < exp` — a token whose `exp` equals the current
//!   second is already expired

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Maximum allowed grant token size in bytes (8KB).
///
/// Typical grants are 300-500 bytes; anything past this cap is rejected
/// before base64 decoding or signature verification runs.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Maximum accepted `userId` length in characters.
pub const MAX_USER_ID_CHARS: usize = 255;

/// Participation role carried by a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Participant,
    Viewer,
}

impl Role {
    /// The wire spelling of this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Participant => "participant",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Role::Host),
            "participant" => Ok(Role::Participant),
            "viewer" => Ok(Role::Viewer),
            _ => Err(GrantError::Invalid),
        }
    }
}

/// Claims carried by a grant token.
///
/// Field names follow the wire format: `jti` is the unique grant ID,
/// `appId` the owning tenant, `iat`/`exp` unix-second timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantClaims {
    /// Unique grant identifier (dedup key and future revocation handle).
    pub jti: String,

    /// Owning tenant identifier.
    #[serde(rename = "appId")]
    pub app_id: String,

    /// Room the grant admits to.
    #[serde(rename = "roomId")]
    pub room_id: String,

    /// User identity as asserted by the tenant.
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Participation role.
    pub role: Role,

    /// Issued-at timestamp (unix seconds).
    pub iat: i64,

    /// Expiry timestamp (unix seconds, exclusive).
    pub exp: i64,
}

impl GrantClaims {
    /// Assemble a fresh claim set expiring `ttl_seconds` from `now`.
    #[must_use]
    pub fn new(
        app_id: String,
        room_id: String,
        user_id: String,
        role: Role,
        now: i64,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            jti: Uuid::new_v4().to_string(),
            app_id,
            room_id,
            user_id,
            role,
            iat: now,
            exp: now + ttl_seconds,
        }
    }
}

/// Errors from grant signing, verification, and ttl parsing.
///
/// Verification failures are intentionally generic: the reason is logged at
/// debug level server-side, never echoed to the presenting client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// Signature mismatch, malformed envelope, or ill-formed claims.
    #[error("The grant token is invalid")]
    Invalid,

    /// Signature verified but the validity window has passed.
    #[error("The grant token has expired")]
    Expired,

    /// A ttl string did not parse as `<integer><s|m|h|d>`.
    #[error("Invalid ttl: {0}")]
    InvalidTtl(String),
}

/// Sign a claim set into a compact grant token.
///
/// # Errors
///
/// Returns [`GrantError::Invalid`] if encoding fails (claims that cannot
/// serialize), which does not occur for well-formed [`GrantClaims`].
pub fn sign_grant(claims: &GrantClaims, secret: &[u8]) -> Result<String, GrantError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| {
        tracing::debug!(target: "common.grant", error = %e, "Grant signing failed");
        GrantError::Invalid
    })
}

/// Verify a grant token against the current wall clock.
///
/// # Errors
///
/// See [`verify_grant_at`].
pub fn verify_grant(token: &str, secret: &[u8]) -> Result<GrantClaims, GrantError> {
    verify_grant_at(token, secret, Utc::now().timestamp())
}

/// Deterministic grant verification against an explicit `now` timestamp.
///
/// Prefer [`verify_grant`] in production code; this variant exists so the
/// exact expiry boundary can be unit-tested without wall-clock dependence.
///
/// # Errors
///
/// - [`GrantError::Invalid`] — oversized token, envelope that does not
///   parse, signature that does not verify under HS256, ill-formed claims,
///   or `iat` in the future
/// - [`GrantError::Expired`] — signature verified but `now >= exp`
pub fn verify_grant_at(token: &str, secret: &[u8], now: i64) -> Result<GrantClaims, GrantError> {
    // Size check first (DoS prevention)
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "common.grant",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Grant rejected: size exceeds maximum allowed"
        );
        return Err(GrantError::Invalid);
    }

    // The algorithm is fixed here; the header's `alg` claim is not trusted.
    // Expiry is checked manually below so that `exp == now` already counts
    // as expired.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = std::collections::HashSet::new();

    let data = decode::<GrantClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| {
            tracing::debug!(target: "common.grant", error = %e, "Grant verification failed");
            GrantError::Invalid
        })?;

    let claims = data.claims;

    if claims.jti.is_empty()
        || claims.app_id.is_empty()
        || claims.room_id.is_empty()
        || claims.user_id.is_empty()
        || claims.user_id.chars().count() > MAX_USER_ID_CHARS
    {
        tracing::debug!(target: "common.grant", "Grant rejected: ill-formed claims");
        return Err(GrantError::Invalid);
    }

    if now < claims.iat {
        tracing::debug!(
            target: "common.grant",
            iat = claims.iat,
            now = now,
            "Grant rejected: issued in the future"
        );
        return Err(GrantError::Invalid);
    }

    if now >= claims.exp {
        return Err(GrantError::Expired);
    }

    Ok(claims)
}

/// Parse a ttl string of the form `<integer><s|m|h|d>` into seconds.
///
/// The integer part accepts at most nine digits.
///
/// # Errors
///
/// Returns [`GrantError::InvalidTtl`] for an empty value, a non-positive or
/// oversized integer, or an unknown unit suffix.
pub fn parse_ttl(input: &str) -> Result<i64, GrantError> {
    let s = input.trim();
    let invalid = || GrantError::InvalidTtl(input.to_string());

    if s.len() < 2 || !s.is_ascii() {
        return Err(invalid());
    }

    let (digits, unit) = s.split_at(s.len() - 1);
    if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let value: i64 = digits.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }

    let unit_seconds = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return Err(invalid()),
    };

    Ok(value * unit_seconds)
}
