//! Tenant store: lookup and secret verification.
//!
//! # Security
//!
//! Secret verification is constant-time via `ring::constant_time`, and a
//! dummy comparison runs when the tenant does not exist so a missing
//! tenant is not distinguishable from a wrong secret by timing.

use super::StoreError;
use crate::models::Tenant;
use chrono::Utc;
use ring::constant_time::verify_slices_are_equal;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Length of generated tenant secrets in bytes (256 bits, hex-encoded).
const TENANT_SECRET_BYTES: usize = 32;

/// Compared against when the tenant is unknown, to equalize timing.
const DUMMY_SECRET: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Store of tenants as the core consumes them.
pub trait TenantStore: Send + Sync {
    /// Create a tenant with a fresh id and secret.
    fn create(&self, name: &str) -> Tenant;

    /// All tenants, in creation order.
    fn list(&self) -> Vec<Tenant>;

    /// Look up a tenant by id.
    fn lookup(&self, tenant_id: &str) -> Option<Tenant>;

    /// Verify a presented secret with a constant-time comparison.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] when the pair does not match — whether
    /// because the tenant is unknown or the secret is wrong.
    fn verify_secret(&self, tenant_id: &str, presented_secret: &str)
        -> Result<Tenant, StoreError>;
}

/// In-memory tenant store.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    tenants: Mutex<Vec<Tenant>>,
}

impl InMemoryTenantStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Tenant>> {
        self.tenants.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Generate a high-entropy tenant secret.
#[allow(clippy::expect_used)] // CSPRNG fill on 32 bytes is an unreachable failure
fn generate_secret() -> String {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TENANT_SECRET_BYTES];
    rng.fill(&mut bytes)
        .expect("CSPRNG should not fail on 32 bytes");
    hex::encode(bytes)
}

impl TenantStore for InMemoryTenantStore {
    fn create(&self, name: &str) -> Tenant {
        let tenant = Tenant {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            secret: generate_secret(),
            created_at: Utc::now(),
        };
        self.lock().push(tenant.clone());
        tracing::info!(target: "ag.repositories.tenants", tenant_id = %tenant.id, "Tenant created");
        tenant
    }

    fn list(&self) -> Vec<Tenant> {
        self.lock().clone()
    }

    fn lookup(&self, tenant_id: &str) -> Option<Tenant> {
        self.lock().iter().find(|t| t.id == tenant_id).cloned()
    }

    fn verify_secret(
        &self,
        tenant_id: &str,
        presented_secret: &str,
    ) -> Result<Tenant, StoreError> {
        let tenant = self.lookup(tenant_id);

        // Always run the comparison so timing does not reveal whether the
        // tenant exists.
        let stored = tenant
            .as_ref()
            .map_or(DUMMY_SECRET, |t| t.secret.as_str());
        let matches =
            verify_slices_are_equal(stored.as_bytes(), presented_secret.as_bytes()).is_ok();

        match tenant {
            Some(tenant) if matches => Ok(tenant),
            _ => Err(StoreError::Unauthorized),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_generates_unique_ids_and_secrets() {
        let store = InMemoryTenantStore::new();
        let a = store.create("one");
        let b = store.create("two");

        assert_ne!(a.id, b.id);
        assert_ne!(a.secret, b.secret);
        assert_eq!(a.secret.len(), TENANT_SECRET_BYTES * 2);
    }

    #[test]
    fn test_list_preserves_creation_order() {
        let store = InMemoryTenantStore::new();
        store.create("one");
        store.create("two");

        let names: Vec<_> = store.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["one", "two"]);
    }

    #[test]
    fn test_lookup() {
        let store = InMemoryTenantStore::new();
        let tenant = store.create("demo");

        assert_eq!(store.lookup(&tenant.id).unwrap().name, "demo");
        assert!(store.lookup("missing").is_none());
    }

    #[test]
    fn test_verify_secret_success() {
        let store = InMemoryTenantStore::new();
        let tenant = store.create("demo");

        let verified = store.verify_secret(&tenant.id, &tenant.secret).unwrap();
        assert_eq!(verified.id, tenant.id);
    }

    #[test]
    fn test_verify_secret_wrong_value() {
        let store = InMemoryTenantStore::new();
        let tenant = store.create("demo");

        assert_eq!(
            store.verify_secret(&tenant.id, "wrong"),
            Err(StoreError::Unauthorized)
        );
    }

    #[test]
    fn test_verify_secret_unknown_tenant() {
        let store = InMemoryTenantStore::new();
        assert_eq!(
            store.verify_secret("missing", "anything"),
            Err(StoreError::Unauthorized)
        );
    }

    #[test]
    fn test_cross_tenant_secret_rejected() {
        let store = InMemoryTenantStore::new();
        let a = store.create("one");
        let b = store.create("two");

        assert_eq!(
            store.verify_secret(&a.id, &b.secret),
            Err(StoreError::Unauthorized)
        );
    }
}
