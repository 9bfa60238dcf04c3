//! Request middleware for the access plane.

mod auth;

pub use auth::require_tenant_auth;
