//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] crate types used for all sensitive values:
//! tenant secrets, signing keys, and any credential that must never appear
//! in `Debug` output or tracing fields. `SecretString` redacts itself in
//! `Debug` and zeroizes its memory on drop; the actual value is only
//! reachable through an explicit [`ExposeSecret::expose_secret`] call.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct TenantCredentials {
//!     tenant_id: String,
//!     secret: SecretString,
//! }
//!
//! let creds = TenantCredentials {
//!     tenant_id: "app-1".to_string(),
//!     secret: SecretString::from("tnt_4f2a91c0ddee"),
//! };
//!
//! // Safe: the secret renders as [REDACTED]
//! let rendered = format!("{creds:?}");
//! assert!(!rendered.contains("tnt_4f2a91c0ddee"));
//!
//! // The actual value requires an explicit expose_secret() call
//! assert_eq!(creds.secret.expose_secret(), "tnt_4f2a91c0ddee");
//! ```

use std::collections::HashMap;
use thiserror::Error;

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Minimum accepted signing secret length in bytes.
///
/// HMAC-SHA256 keys shorter than the hash output weaken the construction,
/// so anything under 32 bytes is refused outright.
pub const MIN_SIGNING_SECRET_BYTES: usize = 32;

/// Fixed signing secret substituted outside production when none is set.
///
/// Both planes resolve the secret through [`signing_secret_from_vars`], so
/// a secretless development setup still produces grants the signaling
/// endpoint accepts.
const DEV_SIGNING_SECRET: &str = "switchboard-development-signing-secret";

/// Errors from resolving the shared signing secret.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningSecretError {
    /// `SIGNING_SECRET` is unset and the environment is production.
    #[error("SIGNING_SECRET must be set in production")]
    Missing,

    /// The configured secret is shorter than [`MIN_SIGNING_SECRET_BYTES`].
    #[error("SIGNING_SECRET must be at least {MIN_SIGNING_SECRET_BYTES} bytes")]
    TooShort,
}

/// Resolve the shared grant signing secret from an environment map.
///
/// The secret is required (and length-checked) when `APP_ENV=production`;
/// any other environment falls back to a fixed development secret with a
/// warning so the access and signaling planes still agree on signatures.
///
/// # Errors
///
/// Returns [`SigningSecretError::Missing`] when unset in production and
/// [`SigningSecretError::TooShort`] when the value is under the minimum
/// length in any environment.
pub fn signing_secret_from_vars(
    vars: &HashMap<String, String>,
) -> Result<SecretString, SigningSecretError> {
    let is_production = vars.get("APP_ENV").map(String::as_str) == Some("production");

    match vars.get("SIGNING_SECRET") {
        Some(secret) => {
            if secret.len() < MIN_SIGNING_SECRET_BYTES {
                return Err(SigningSecretError::TooShort);
            }
            Ok(SecretString::from(secret.clone()))
        }
        None if is_production => Err(SigningSecretError::Missing),
        None => {
            tracing::warn!(
                target: "common.secret",
                "SIGNING_SECRET is not set; using the fixed development secret"
            );
            Ok(SecretString::from(DEV_SIGNING_SECRET))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_secret_is_redacted_in_debug() {
        let vars = HashMap::from([(
            "SIGNING_SECRET".to_string(),
            "grant-signing-secret-0123456789abcdef".to_string(),
        )]);
        let secret = signing_secret_from_vars(&vars).expect("secret should resolve");

        // The resolved secret must never render in logs or Debug output.
        let rendered = format!("{secret:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("grant-signing-secret"));
    }

    #[test]
    fn test_signing_secret_explicit_value() {
        let vars = HashMap::from([(
            "SIGNING_SECRET".to_string(),
            "0123456789abcdef0123456789abcdef".to_string(),
        )]);

        let secret = signing_secret_from_vars(&vars).expect("secret should resolve");
        assert_eq!(secret.expose_secret(), "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn test_signing_secret_rejects_short_value() {
        let vars = HashMap::from([("SIGNING_SECRET".to_string(), "too-short".to_string())]);

        assert!(matches!(
            signing_secret_from_vars(&vars),
            Err(SigningSecretError::TooShort)
        ));
    }

    #[test]
    fn test_signing_secret_required_in_production() {
        let vars = HashMap::from([("APP_ENV".to_string(), "production".to_string())]);

        assert!(matches!(
            signing_secret_from_vars(&vars),
            Err(SigningSecretError::Missing)
        ));
    }

    #[test]
    fn test_signing_secret_development_fallback() {
        let vars = HashMap::new();

        let secret = signing_secret_from_vars(&vars).expect("dev fallback should resolve");
        assert_eq!(secret.expose_secret(), DEV_SIGNING_SECRET);
        assert!(secret.expose_secret().len() >= MIN_SIGNING_SECRET_BYTES);
    }

    #[test]
    fn test_dev_fallback_agrees_across_calls() {
        let a = signing_secret_from_vars(&HashMap::new()).unwrap();
        let b = signing_secret_from_vars(&HashMap::new()).unwrap();
        assert_eq!(a.expose_secret(), b.expose_secret());
    }
}
