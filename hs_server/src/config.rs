//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration.

use half_suit::constants::SESSION_RETENTION;
use std::{net::SocketAddr, time::Duration};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Bound on a single store operation
    pub store_timeout: Duration,
    /// How long finished games are retained before deletion
    pub session_retention: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse.
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_or("SERVER_BIND", default_bind())?,
        };

        let config = ServerConfig {
            bind,
            store_timeout: Duration::from_secs(parse_env_or("STORE_TIMEOUT_SECS", 5)?),
            session_retention: Duration::from_secs(parse_env_or(
                "SESSION_RETENTION_SECS",
                SESSION_RETENTION.as_secs(),
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "STORE_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }
        if self.session_retention.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SESSION_RETENTION_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            store_timeout: Duration::from_secs(5),
            session_retention: SESSION_RETENTION,
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an environment variable, falling back to a default when it is
/// unset and failing loudly when it is set but unparseable.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|err| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("{err}"),
        }),
        Err(_) => Ok(default),
    }
}
