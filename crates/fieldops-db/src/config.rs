//! Application configuration.
//!
//! Loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::pool::DbConfig;

/// Default log filter when `FIELDOPS_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,fieldops_core=debug,fieldops_db=debug,sqlx=warn";

/// FieldOps runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// `tracing_subscriber::EnvFilter` directive string
    pub log_filter: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("FIELDOPS_DB_PATH")
            .unwrap_or_else(|| "./fieldops.db".to_string());
        if database_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue("FIELDOPS_DB_PATH".to_string()));
        }

        let max_connections: u32 = lookup("FIELDOPS_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("FIELDOPS_MAX_CONNECTIONS".to_string()))?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue("FIELDOPS_MAX_CONNECTIONS".to_string()));
        }

        Ok(AppConfig {
            database_path: PathBuf::from(database_path),
            max_connections,
            log_filter: lookup("FIELDOPS_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
