//! Store interfaces consumed by the access plane.
//!
//! The durable store backing tenants and rooms is an external concern;
//! the core only depends on these traits. The shipped implementations are
//! in-memory and suitable for single-node operation and tests.

mod rooms;
mod tenants;

pub use rooms::{InMemoryRoomStore, RoomStore};
pub use tenants::{InMemoryTenantStore, TenantStore};

use thiserror::Error;

/// Store operation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("record not found")]
    NotFound,

    /// Credential pair did not match.
    #[error("invalid credentials")]
    Unauthorized,
}

impl From<StoreError> for crate::errors::ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => {
                crate::errors::ApiError::NotFound("record not found".to_string())
            }
            StoreError::Unauthorized => {
                crate::errors::ApiError::Unauthorized("invalid application credentials".to_string())
            }
        }
    }
}
