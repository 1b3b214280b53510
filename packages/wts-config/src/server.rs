//! Control-plane (HTTP server) configuration types

use crate::{get_env_or_default, parse_env, ConfigResult};

/// ControlPlane HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Comma-separated allowed CORS origins; `None` means "use the environment default"
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl ServerConfig {
    pub fn from_env() -> ConfigResult<Self> {
        let origins = std::env::var("CORS_ALLOWED_ORIGINS").ok().map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        Ok(Self {
            port: parse_env("WTS_PORT", 8000)?,
            cors_allowed_origins: origins,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert!(config.cors_allowed_origins.is_none());
    }

    #[test]
    fn test_get_env_or_default_used_for_placeholder() {
        assert_eq!(get_env_or_default("WTS_UNSET_TEST", "x"), "x");
    }
}
