//! Configuration for the ingestion HTTP service.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// The `[ingest]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Validate the configuration for consistency, called once at startup
    /// before the service is marked ready.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "security.api_key".to_string(),
            });
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "database.url".to_string(),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                message: "database.max_connections must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Authentication and access-control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Secret compared against the `X-API-Key` header on write endpoints.
    pub api_key: String,

    /// Whether `GET /api/metrics` is reachable without `X-API-Key`.
    #[serde(default)]
    pub public_reads: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            public_reads: false,
        }
    }
}

/// Postgres connection pool settings — the Rust-native equivalent of
/// `database.py`'s `pool_recycle=280, pool_pre_ping=True`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub idle_recycle_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/telemetry".to_string(),
            max_connections: 10,
            idle_recycle_seconds: 280,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_invalid_without_an_api_key() {
        let config = IngestConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_with_api_key_and_database_url_is_valid() {
        let mut config = IngestConfig::default();
        config.security.api_key = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_max_connections_is_rejected() {
        let mut config = IngestConfig::default();
        config.security.api_key = "secret".to_string();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
