//! Signaling service error types.
//!
//! Every failure surfaced to a client becomes an `error` frame carrying a
//! stable code string. Whether the transport is then closed depends on the
//! error kind and on whether the connection was already admitted: a
//! malformed frame kills an unadmitted connection but only elicits an
//! error frame on an admitted one. Internal details are logged server-side
//! and never echoed to clients.

use crate::protocol::ServerFrame;
use crate::registry::RegistryError;
use common::grant::GrantError;
use thiserror::Error;

/// Signaling error type.
///
/// Maps to the stable signaling code strings:
/// `INVALID_MESSAGE`, `INVALID_TOKEN`, `TOKEN_EXPIRED`, `TENANT_MISMATCH`,
/// `ROOM_FULL`, `ALREADY_IN_ROOM`, `NOT_IN_ROOM`, `INTERNAL_ERROR`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// Frame failed to parse or carried an unknown tag.
    #[error("Invalid message: {0}")]
    InvalidMessage(&'static str),

    /// Grant signature, claims, or room binding did not verify.
    #[error("Invalid token")]
    InvalidToken,

    /// Grant verified but its validity window has passed.
    #[error("Token expired")]
    TokenExpired,

    /// Room is pinned to a different tenant.
    #[error("Tenant mismatch")]
    TenantMismatch,

    /// Room is at capacity.
    #[error("Room full")]
    RoomFull,

    /// A second join on an already admitted connection.
    #[error("Already in a room")]
    AlreadyInRoom,

    /// Negotiation frame before admission.
    #[error("Not in a room")]
    NotInRoom,

    /// Unexpected fault.
    #[error("Internal error")]
    Internal,
}

impl SignalError {
    /// The stable code string consumed by clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            SignalError::InvalidMessage(_) => "INVALID_MESSAGE",
            SignalError::InvalidToken => "INVALID_TOKEN",
            SignalError::TokenExpired => "TOKEN_EXPIRED",
            SignalError::TenantMismatch => "TENANT_MISMATCH",
            SignalError::RoomFull => "ROOM_FULL",
            SignalError::AlreadyInRoom => "ALREADY_IN_ROOM",
            SignalError::NotInRoom => "NOT_IN_ROOM",
            SignalError::Internal => "INTERNAL_ERROR",
        }
    }

    /// Whether the connection is closed after reporting this error.
    ///
    /// Credential and capacity failures always close. A malformed frame
    /// closes only while unadmitted; once a peer is in a room a single bad
    /// frame is reported and the connection kept.
    #[must_use]
    pub fn is_fatal(&self, admitted: bool) -> bool {
        match self {
            SignalError::InvalidToken
            | SignalError::TokenExpired
            | SignalError::TenantMismatch
            | SignalError::RoomFull
            | SignalError::Internal => true,
            SignalError::InvalidMessage(_) => !admitted,
            SignalError::AlreadyInRoom | SignalError::NotInRoom => false,
        }
    }

    /// A client-safe message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            SignalError::InvalidMessage(reason) => format!("Invalid message: {reason}"),
            SignalError::InvalidToken => "The grant token is invalid".to_string(),
            SignalError::TokenExpired => "The grant token has expired".to_string(),
            SignalError::TenantMismatch => "The room belongs to a different tenant".to_string(),
            SignalError::RoomFull => "The room is at capacity".to_string(),
            SignalError::AlreadyInRoom => "This connection is already in a room".to_string(),
            SignalError::NotInRoom => "Join a room before sending negotiation frames".to_string(),
            SignalError::Internal => "An internal error occurred".to_string(),
        }
    }

    /// Render as an `error` frame for the wire.
    #[must_use]
    pub fn to_frame(&self) -> ServerFrame {
        ServerFrame::Error {
            code: self.code().to_string(),
            message: self.client_message(),
        }
    }
}

impl From<GrantError> for SignalError {
    fn from(err: GrantError) -> Self {
        match err {
            GrantError::Expired => SignalError::TokenExpired,
            GrantError::Invalid | GrantError::InvalidTtl(_) => SignalError::InvalidToken,
        }
    }
}

impl From<RegistryError> for SignalError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyAdmitted => SignalError::AlreadyInRoom,
            RegistryError::TenantMismatch => SignalError::TenantMismatch,
            RegistryError::RoomFull => SignalError::RoomFull,
            RegistryError::Internal => SignalError::Internal,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        assert_eq!(SignalError::InvalidMessage("x").code(), "INVALID_MESSAGE");
        assert_eq!(SignalError::InvalidToken.code(), "INVALID_TOKEN");
        assert_eq!(SignalError::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(SignalError::TenantMismatch.code(), "TENANT_MISMATCH");
        assert_eq!(SignalError::RoomFull.code(), "ROOM_FULL");
        assert_eq!(SignalError::AlreadyInRoom.code(), "ALREADY_IN_ROOM");
        assert_eq!(SignalError::NotInRoom.code(), "NOT_IN_ROOM");
        assert_eq!(SignalError::Internal.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_credential_and_capacity_errors_are_fatal() {
        for err in [
            SignalError::InvalidToken,
            SignalError::TokenExpired,
            SignalError::TenantMismatch,
            SignalError::RoomFull,
            SignalError::Internal,
        ] {
            assert!(err.is_fatal(false), "{err:?} should close when unadmitted");
            assert!(err.is_fatal(true), "{err:?} should close when admitted");
        }
    }

    #[test]
    fn test_invalid_message_fatality_depends_on_admission() {
        let err = SignalError::InvalidMessage("malformed frame");
        assert!(err.is_fatal(false));
        assert!(!err.is_fatal(true));
    }

    #[test]
    fn test_state_errors_are_never_fatal() {
        for err in [SignalError::AlreadyInRoom, SignalError::NotInRoom] {
            assert!(!err.is_fatal(false));
            assert!(!err.is_fatal(true));
        }
    }

    #[test]
    fn test_grant_error_conversion() {
        assert_eq!(
            SignalError::from(GrantError::Expired),
            SignalError::TokenExpired
        );
        assert_eq!(
            SignalError::from(GrantError::Invalid),
            SignalError::InvalidToken
        );
    }

    #[test]
    fn test_registry_error_conversion() {
        assert_eq!(
            SignalError::from(RegistryError::RoomFull),
            SignalError::RoomFull
        );
        assert_eq!(
            SignalError::from(RegistryError::TenantMismatch),
            SignalError::TenantMismatch
        );
        assert_eq!(
            SignalError::from(RegistryError::AlreadyAdmitted),
            SignalError::AlreadyInRoom
        );
        assert_eq!(
            SignalError::from(RegistryError::Internal),
            SignalError::Internal
        );
    }

    #[test]
    fn test_error_frame_shape() {
        let frame = SignalError::RoomFull.to_frame();
        let ServerFrame::Error { code, message } = frame else {
            panic!("expected error frame");
        };
        assert_eq!(code, "ROOM_FULL");
        assert!(!message.is_empty());
    }

    #[test]
    fn test_internal_message_hides_details() {
        assert_eq!(
            SignalError::Internal.client_message(),
            "An internal error occurred"
        );
    }
}
