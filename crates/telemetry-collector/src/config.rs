//! Per-collector configuration sections.
//!
//! Field names and defaults mirror `sharedUtils/config/models.py`'s
//! `CollectorConfig`, `LocalCollectorConfig`, and
//! `WikipediaCollectorConfig`. The top-level `config::Config` document that
//! loads these from `config.toml` + environment overrides lives in
//! `telemetry-aggregator`, which owns the `[collectors]`,
//! `[local_collector]`, and `[wikipedia_collector]` TOML sections.

use serde::Deserialize;

/// Shared collector defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub default_interval: u64,
    pub metric_precision: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            default_interval: 60,
            metric_precision: 2,
        }
    }
}

/// Settings for the local system-metrics collector.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalCollectorConfig {
    pub collection_interval: u64,
    pub cpu_sample_interval: f32,
}

impl Default for LocalCollectorConfig {
    fn default() -> Self {
        Self {
            collection_interval: 60,
            cpu_sample_interval: 1.0,
        }
    }
}

/// Settings for the Wikipedia recent-changes collector.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikipediaCollectorConfig {
    pub collection_interval: u64,
    pub collection_window: u64,
    pub user_agent: String,
    pub language: String,
}

impl Default for WikipediaCollectorConfig {
    fn default() -> Self {
        Self {
            collection_interval: 60,
            collection_window: 60,
            user_agent: "telemetry-aggregator/1.0".to_string(),
            language: "en".to_string(),
        }
    }
}
