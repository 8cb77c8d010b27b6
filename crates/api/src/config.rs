//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 8080)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 25)
//! - `DB_MAX_LIFETIME_SECS` - Maximum lifetime of a pooled connection (default: 3600)
//! - `DB_ACQUIRE_TIMEOUT_SECS` - How long to wait for a free connection (default: 10)
//! - `OPERATION_TIMEOUT_SECS` - Bound on each store operation (default: 5)
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::db::DEFAULT_OPERATION_TIMEOUT;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Connection pool settings
    pub database: DatabaseConfig,
    /// Bound on each store operation
    pub operation_timeout: Duration,
    /// Log output format
    pub log_format: LogFormat,
}

/// Connection pool configuration.
///
/// Implements `Debug` manually to redact the connection string.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub url: SecretString,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connections older than this are closed and replaced
    pub max_lifetime: Duration,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("max_lifetime", &self.max_lifetime)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key/value source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database = DatabaseConfig {
            url: SecretString::from(env.required("DATABASE_URL")?),
            max_connections: env.parsed_or("DB_MAX_CONNECTIONS", 25)?,
            max_lifetime: Duration::from_secs(env.parsed_or("DB_MAX_LIFETIME_SECS", 3600)?),
            acquire_timeout: Duration::from_secs(env.parsed_or("DB_ACQUIRE_TIMEOUT_SECS", 10)?),
        };

        if database.max_connections == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "DB_MAX_CONNECTIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let default_timeout = DEFAULT_OPERATION_TIMEOUT.as_secs();
        let operation_timeout_secs = env.parsed_or("OPERATION_TIMEOUT_SECS", default_timeout)?;
        if operation_timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "OPERATION_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            host: env.parsed_or("API_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: env.parsed_or("API_PORT", 8080)?,
            database,
            operation_timeout: Duration::from_secs(operation_timeout_secs),
            log_format: env.parsed_or("LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, falling back to `default` when it is unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        (self.0)(key).map_or(Ok(default), |value| {
            value
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}
