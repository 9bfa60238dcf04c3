//! Signaling service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::{signing_secret_from_vars, SecretString, SigningSecretError};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default WebSocket bind address.
pub const DEFAULT_SIGNALING_BIND_ADDRESS: &str = "0.0.0.0:3001";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: u64 = 30;

/// Signaling service configuration.
///
/// Loaded from environment variables with sensible defaults. The signing
/// secret follows the shared resolution rule: required in production,
/// development fallback otherwise.
#[derive(Clone)]
pub struct Config {
    /// WebSocket server bind address (default: "0.0.0.0:3001").
    pub bind_address: String,

    /// Shared grant signing secret.
    /// Protected by `SecretString` to prevent accidental logging.
    pub signing_secret: SecretString,

    /// Heartbeat interval in seconds (default: 30).
    pub heartbeat_interval_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("signing_secret", &"[REDACTED]")
            .field(
                "heartbeat_interval_seconds",
                &self.heartbeat_interval_seconds,
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    SigningSecret(#[from] SigningSecretError),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a value does not parse or the signing
    /// secret resolution fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a value does not parse or the signing
    /// secret resolution fails.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let signing_secret = signing_secret_from_vars(vars)?;

        let bind_address = match (vars.get("SIGNALING_BIND_ADDRESS"), vars.get("SIGNALING_PORT")) {
            (Some(addr), _) => addr.clone(),
            (None, Some(port)) => {
                let port: u16 = port.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("SIGNALING_PORT: {port}"))
                })?;
                format!("0.0.0.0:{port}")
            }
            (None, None) => DEFAULT_SIGNALING_BIND_ADDRESS.to_string(),
        };

        let heartbeat_interval_seconds = match vars.get("HEARTBEAT_INTERVAL_SECONDS") {
            Some(raw) => raw.parse().ok().filter(|&secs| secs > 0).ok_or_else(|| {
                ConfigError::InvalidValue(format!("HEARTBEAT_INTERVAL_SECONDS: {raw}"))
            })?,
            None => DEFAULT_HEARTBEAT_INTERVAL_SECONDS,
        };

        Ok(Config {
            bind_address,
            signing_secret,
            heartbeat_interval_seconds,
        })
    }

    /// The heartbeat interval as a [`Duration`].
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "SIGNING_SECRET".to_string(),
            "test-signing-secret-0123456789abcdef".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).expect("config should load");

        assert_eq!(config.bind_address, DEFAULT_SIGNALING_BIND_ADDRESS);
        assert_eq!(
            config.heartbeat_interval_seconds,
            DEFAULT_HEARTBEAT_INTERVAL_SECONDS
        );
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_vars_custom_values() {
        let mut vars = base_vars();
        vars.insert(
            "SIGNALING_BIND_ADDRESS".to_string(),
            "127.0.0.1:4001".to_string(),
        );
        vars.insert("HEARTBEAT_INTERVAL_SECONDS".to_string(), "5".to_string());

        let config = Config::from_vars(&vars).expect("config should load");
        assert_eq!(config.bind_address, "127.0.0.1:4001");
        assert_eq!(config.heartbeat_interval_seconds, 5);
    }

    #[test]
    fn test_signaling_port_shorthand() {
        let mut vars = base_vars();
        vars.insert("SIGNALING_PORT".to_string(), "4500".to_string());

        let config = Config::from_vars(&vars).expect("config should load");
        assert_eq!(config.bind_address, "0.0.0.0:4500");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut vars = base_vars();
        vars.insert("SIGNALING_PORT".to_string(), "not-a-port".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_zero_heartbeat_rejected() {
        let mut vars = base_vars();
        vars.insert("HEARTBEAT_INTERVAL_SECONDS".to_string(), "0".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_missing_secret_in_production_rejected() {
        let vars = HashMap::from([("APP_ENV".to_string(), "production".to_string())]);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::SigningSecret(SigningSecretError::Missing))
        ));
    }

    #[test]
    fn test_development_fallback_secret() {
        let config = Config::from_vars(&HashMap::new()).expect("dev config should load");
        assert!(!config.signing_secret.expose_secret().is_empty());
    }

    #[test]
    fn test_debug_redacts_signing_secret() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let rendered = format!("{config:?}");

        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("test-signing-secret"));
    }
}
