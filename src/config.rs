//! Application configuration management.
//!
//! The configuration document is JSON with two sections, `redis` for the
//! cache endpoint and `database` for the statement store:
//!
//! ```json
//! {
//!   "redis": { "host": "127.0.0.1", "port": 6379 },
//!   "database": { "path": "/var/lib/primarysources/statements.db" }
//! }
//! ```
//!
//! Values are layered with figment: built-in defaults, then the file given
//! with `-c`, then `UPDATECACHE_`-prefixed environment variables (use `__`
//! for nesting, e.g. `UPDATECACHE_REDIS__PORT=6380`).

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::pipeline::Grouping;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "UPDATECACHE_";

/// Errors raised while loading the configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// The configuration could not be read or parsed.
    #[error("Invalid configuration: {0}")]
    Extract(#[from] figment::Error),

    /// A required value is missing or out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Cache endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Logical database selected after connecting
    pub db: u32,
    /// Connect, read and write timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            timeout_ms: 5000,
        }
    }
}

/// Statement store connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// How long to wait on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            busy_timeout_ms: 5000,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache endpoint
    pub redis: RedisConfig,
    /// Statement store
    pub database: DatabaseConfig,
    /// How statements are grouped into batches
    pub grouping: Grouping,
}

impl Config {
    /// Load the configuration from `path`, layered over defaults and under
    /// environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check values that have no usable default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database.path must name the statement database".to_string(),
            ));
        }
        if self.redis.host.trim().is_empty() {
            return Err(ConfigError::Invalid("redis.host must not be empty".to_string()));
        }
        if self.redis.port == 0 {
            return Err(ConfigError::Invalid("redis.port must not be 0".to_string()));
        }
        Ok(())
    }
}
