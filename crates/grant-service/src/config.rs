//! Access plane configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::grant::{parse_ttl, GrantError};
use common::secret::{signing_secret_from_vars, SecretString, SigningSecretError};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default REST API bind address.
pub const DEFAULT_API_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default grant lifetime applied when a request carries no `expiresIn`.
pub const DEFAULT_GRANT_TTL: &str = "1h";

/// Access plane configuration.
#[derive(Clone)]
pub struct Config {
    /// REST API bind address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// Shared grant signing secret.
    /// Protected by `SecretString` to prevent accidental logging.
    pub signing_secret: SecretString,

    /// Default grant ttl in seconds (default: 1 hour).
    pub default_ttl_seconds: i64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("signing_secret", &"[REDACTED]")
            .field("default_ttl_seconds", &self.default_ttl_seconds)
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

        let bind_address = match (vars.get("API_BIND_ADDRESS"), vars.get("API_PORT")) {
            (Some(addr), _) => addr.clone(),
            (None, Some(port)) => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(format!("API_PORT: {port}")))?;
                format!("0.0.0.0:{port}")
            }
            (None, None) => DEFAULT_API_BIND_ADDRESS.to_string(),
        };

        let ttl_input = vars
            .get("DEFAULT_GRANT_TTL")
            .map_or(DEFAULT_GRANT_TTL, String::as_str);
        let default_ttl_seconds = parse_ttl(ttl_input).map_err(|e| match e {
            GrantError::InvalidTtl(v) => {
                ConfigError::InvalidValue(format!("DEFAULT_GRANT_TTL: {v}"))
            }
            other => ConfigError::InvalidValue(other.to_string()),
        })?;

        Ok(Config {
            bind_address,
            signing_secret,
            default_ttl_seconds,
        })
    }
}
