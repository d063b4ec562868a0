//! Upload queue configuration.
//!
//! Field names mirror `UploadQueueConfig` from the original
//! `sharedUtils/config/models.py`; this crate's `config::Config` layering
//! (TOML file + `APP__QUEUE__*` env overrides) lives in `telemetry-aggregator`,
//! which owns the top-level config document and passes this struct down.

use std::time::Duration;

/// Settings for one `UploadQueue` instance.
#[derive(Debug, Clone)]
pub struct UploadQueueConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: u8,
    pub redis_password: Option<String>,

    pub api_endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,

    pub max_retry_attempts: u32,
    pub backoff_base: u64,
    pub backoff_multiplier: u32,
    pub worker_sleep: Duration,
}

impl UploadQueueConfig {
    pub fn redis_url(&self) -> String {
        let auth = self
            .redis_password
            .as_deref()
            .map(|pw| format!(":{pw}@"))
            .unwrap_or_default();
        format!(
            "redis://{auth}{host}:{port}/{db}",
            auth = auth,
            host = self.redis_host,
            port = self.redis_port,
            db = self.redis_db
        )
    }
}

impl Default for UploadQueueConfig {
    fn default() -> Self {
        Self {
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_db: 0,
            redis_password: None,
            api_endpoint: String::new(),
            api_key: None,
            timeout: Duration::from_secs(10),
            max_retry_attempts: 5,
            backoff_base: 2,
            backoff_multiplier: 2,
            worker_sleep: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_omits_auth_when_no_password() {
        let config = UploadQueueConfig::default();
        assert_eq!(config.redis_url(), "redis://localhost:6379/0");
    }

    #[test]
    fn redis_url_includes_password_when_set() {
        let config = UploadQueueConfig {
            redis_password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert_eq!(config.redis_url(), "redis://:hunter2@localhost:6379/0");
    }
}
