//! Job-store (embedded database) configuration types

use crate::{get_env_or_default, parse_env, ConfigResult};
use std::path::PathBuf;

/// SQLite-backed job store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the single database file on disk
    pub db_path: PathBuf,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,

    /// Age after which an `analyzing` job is considered stale and reset to `queued`
    pub stale_job_max_age_secs: u64,
}

impl StoreConfig {
    /// Load job-store configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            db_path: PathBuf::from(get_env_or_default("WTS_DB_PATH", "./whats-that-sound.db")),
            max_connections: parse_env("WTS_DB_MAX_CONNECTIONS", 8)?,
            connect_timeout_secs: parse_env("WTS_DB_CONNECT_TIMEOUT", 30)?,
            stale_job_max_age_secs: parse_env("STALE_JOB_MAX_AGE_SECS", 300)?,
        })
    }

    /// Create a configuration pointed at a custom path (useful for testing)
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
            max_connections: 8,
            connect_timeout_secs: 30,
            stale_job_max_age_secs: 300,
        }
    }

    /// The `sqlx` connection string for this store
    pub fn connection_string(&self) -> String {
        format!("sqlite://{}", self.db_path.display())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./whats-that-sound.db"),
            max_connections: 8,
            connect_timeout_secs: 30,
            stale_job_max_age_secs: 300,
        }
    }
}
