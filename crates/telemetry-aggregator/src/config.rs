//! The top-level configuration document for the aggregator process.
//!
//! Owns every TOML section spec.md recognises (`[aggregator]`,
//! `[collectors]`, `[local_collector]`, `[wikipedia_collector]`,
//! `[upload_queue]`, `[logging]`) and is the sole place that layers a
//! `config.toml` file with `APP__SECTION__KEY`-style environment overrides
//! (the `config` crate's `Environment::with_prefix("APP").separator("__")`
//! convention).

use serde::Deserialize;
use telemetry_collector::{LocalCollectorConfig, WikipediaCollectorConfig};
use telemetry_queue::UploadQueueConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aggregator: AggregatorSection,
    pub collectors: CollectorsSection,
    pub local_collector: LocalCollectorSection,
    pub wikipedia_collector: WikipediaCollectorSection,
    pub upload_queue: UploadQueueSection,
    pub logging: LoggingSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggregator: AggregatorSection::default(),
            collectors: CollectorsSection::default(),
            local_collector: LocalCollectorSection::default(),
            wikipedia_collector: WikipediaCollectorSection::default(),
            upload_queue: UploadQueueSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorSection {
    pub name: String,
}

impl Default for AggregatorSection {
    fn default() -> Self {
        Self {
            name: "edge-aggregator".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorsSection {
    pub metric_precision: usize,
    pub cpu_sample_interval: f32,
}

impl Default for CollectorsSection {
    fn default() -> Self {
        Self {
            metric_precision: 2,
            cpu_sample_interval: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalCollectorSection {
    pub enabled: bool,
    pub collection_interval: u64,
}

impl Default for LocalCollectorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            collection_interval: 60,
        }
    }
}

impl LocalCollectorSection {
    pub fn collector_config(&self) -> LocalCollectorConfig {
        LocalCollectorConfig {
            collection_interval: self.collection_interval,
            cpu_sample_interval: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikipediaCollectorSection {
    pub enabled: bool,
    pub collection_interval: u64,
    pub collection_window: u64,
    pub user_agent: String,
}

impl Default for WikipediaCollectorSection {
    fn default() -> Self {
        Self {
            enabled: false,
            collection_interval: 60,
            collection_window: 60,
            user_agent: "telemetry-aggregator/1.0".to_string(),
        }
    }
}

impl WikipediaCollectorSection {
    pub fn collector_config(&self) -> WikipediaCollectorConfig {
        WikipediaCollectorConfig {
            collection_interval: self.collection_interval,
            collection_window: self.collection_window,
            user_agent: self.user_agent.clone(),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadQueueSection {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: u8,
    pub redis_password: Option<String>,

    pub api_endpoint: String,
    pub api_key: Option<String>,
    pub timeout: u64,

    pub max_retry_attempts: u32,
    pub backoff_base: u64,
    pub backoff_multiplier: u32,
    pub worker_sleep: u64,

    /// Base URL the orchestrator polls for `/health` and posts registration
    /// requests to. Distinct from `api_endpoint`, which is where snapshots
    /// are uploaded — the same server in most deployments, but the queue
    /// worker and the registration client are separate clients.
    pub registration_base_url: String,
}

impl Default for UploadQueueSection {
    fn default() -> Self {
        Self {
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_db: 0,
            redis_password: None,
            api_endpoint: "http://localhost:8080/api/metrics".to_string(),
            api_key: None,
            timeout: 10,
            max_retry_attempts: 5,
            backoff_base: 2,
            backoff_multiplier: 2,
            worker_sleep: 1,
            registration_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl UploadQueueSection {
    pub fn queue_config(&self) -> UploadQueueConfig {
        UploadQueueConfig {
            redis_host: self.redis_host.clone(),
            redis_port: self.redis_port,
            redis_db: self.redis_db,
            redis_password: self.redis_password.clone(),
            api_endpoint: self.api_endpoint.clone(),
            api_key: self.api_key.clone(),
            timeout: std::time::Duration::from_secs(self.timeout),
            max_retry_attempts: self.max_retry_attempts,
            backoff_base: self.backoff_base,
            backoff_multiplier: self.backoff_multiplier,
            worker_sleep: std::time::Duration::from_secs(self.worker_sleep),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
            format: "text".to_string(),
        }
    }
}
