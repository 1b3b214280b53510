//! Shared configuration types for the whats-that-sound pipeline.
//!
//! Every environment variable named by the process is read exactly once,
//! here, at startup; everything downstream receives an immutable,
//! already-validated configuration struct.

mod error;
mod oracle;
mod server;
mod store;
mod worker;

pub use error::{ConfigError, ConfigResult};
pub use oracle::{OracleConfig, OracleProvider};
pub use server::ServerConfig;
pub use store::StoreConfig;
pub use worker::WorkerConfig;

use std::env;

/// Top-level configuration shared across the worker pool and control plane.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub oracle: OracleConfig,
    pub worker: WorkerConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    pub log_filter: String,
}

/// Process environment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl Config {
    /// Load the full configuration from environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            store: StoreConfig::from_env()?,
            oracle: OracleConfig::from_env()?,
            worker: WorkerConfig::from_env()?,
            server: ServerConfig::from_env()?,
            environment: Environment::from_str(
                &env::var("APP_ENV")
                    .or_else(|_| env::var("ENVIRONMENT"))
                    .unwrap_or_else(|_| "development".to_string()),
            ),
            log_filter: env::var("RUST_LOG")
                .or_else(|_| env::var("WTS_LOG"))
                .unwrap_or_else(|_| "whats_that_sound=info,tower_http=info".to_string()),
        })
    }
}

/// Get a required environment variable, erroring with its name when absent.
pub fn get_required_env(name: &str) -> ConfigResult<String> {
    env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

/// Get an optional environment variable, falling back to a default.
pub fn get_env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable into a specific type, falling back to a default.
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{e}"))),
        Err(_) => Ok(default),
    }
}
