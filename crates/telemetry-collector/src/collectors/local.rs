//! Local system metrics: CPU%, RAM%, RAM used MB, CPU temperature.
//!
//! Grounded on `collectors/LocalCollector.py`: same metric names, same
//! sensor-name search order (`coretemp`, `k10temp`, `zenpower`, falling back
//! to the first available sensor), same rounding to a configured precision.
//! `psutil` has no idiomatic Rust equivalent in this corpus, so `sysinfo` —
//! the ecosystem's standard cross-platform system-metrics crate — stands in
//! for it.

use crate::collector::Collector;
use crate::config::LocalCollectorConfig;
use crate::error::CollectorError;
use async_trait::async_trait;
use std::sync::Mutex;
use sysinfo::{Components, System};
use telemetry_schema::MetricEntry;

const BYTES_TO_MB: f64 = 1024.0 * 1024.0;
const SENSOR_NAMES: [&str; 3] = ["coretemp", "k10temp", "zenpower"];
const SOURCE: &str = "local";

struct Sensors {
    system: System,
    components: Components,
}

/// Samples CPU usage, RAM usage, and (when available) CPU temperature from
/// the host the aggregator runs on.
pub struct LocalCollector {
    device_name: String,
    precision: usize,
    sensors: Mutex<Sensors>,
}

impl LocalCollector {
    /// `metric_precision` comes from the shared `[collectors]` config
    /// section; `config` carries this collector's own settings.
    pub fn new(
        device_name: impl Into<String>,
        _config: &LocalCollectorConfig,
        metric_precision: usize,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            precision: metric_precision,
            sensors: Mutex::new(Sensors {
                system: System::new(),
                components: Components::new_with_refreshed_list(),
            }),
        }
    }

    fn cpu_temperature(components: &Components) -> Option<f64> {
        for sensor_name in SENSOR_NAMES {
            if let Some(component) = components
                .iter()
                .find(|c| c.label().to_lowercase().contains(sensor_name))
            {
                if let Some(temp) = component.temperature() {
                    return Some(temp as f64);
                }
            }
        }
        components
            .iter()
            .find_map(|c| c.temperature().map(|t| t as f64))
    }

    fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.precision as i32);
        (value * factor).round() / factor
    }
}

#[async_trait]
impl Collector for LocalCollector {
    async fn collect(&self) -> Result<Vec<MetricEntry>, CollectorError> {
        let mut guard = self.sensors.lock().expect("sensors lock poisoned");
        guard.system.refresh_cpu_usage();
        guard.system.refresh_memory();
        guard.components.refresh(true);

        let cpu_percent = guard.system.global_cpu_usage() as f64;
        let total_memory = guard.system.total_memory() as f64;
        let used_memory = guard.system.used_memory() as f64;
        let ram_percent = if total_memory > 0.0 {
            used_memory / total_memory * 100.0
        } else {
            0.0
        };
        let cpu_temp = Self::cpu_temperature(&guard.components);
        drop(guard);

        let mut metrics = vec![
            MetricEntry::new("ram_usage_percent", self.round(ram_percent), "%").map_err(|e| {
                CollectorError::SamplingFailed {
                    source_name: SOURCE.to_string(),
                    message: e.to_string(),
                }
            })?,
            MetricEntry::new(
                "ram_used_mb",
                self.round(used_memory / BYTES_TO_MB),
                "MB",
            )
            .map_err(|e| CollectorError::SamplingFailed {
                source_name: SOURCE.to_string(),
                message: e.to_string(),
            })?,
            MetricEntry::new("cpu_usage_percent", self.round(cpu_percent), "%").map_err(|e| {
                CollectorError::SamplingFailed {
                    source_name: SOURCE.to_string(),
                    message: e.to_string(),
                }
            })?,
        ];

        if let Some(temp) = cpu_temp {
            metrics.push(
                MetricEntry::new("cpu_temp_celsius", self.round(temp), "\u{b0}C").map_err(|e| {
                    CollectorError::SamplingFailed {
                        source_name: SOURCE.to_string(),
                        message: e.to_string(),
                    }
                })?,
            );
        }

        Ok(metrics)
    }

    fn source(&self) -> &str {
        SOURCE
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collects_cpu_and_ram_metrics() {
        let collector =
            LocalCollector::new("local-system-001", &LocalCollectorConfig::default(), 2);
        let metrics = collector.collect().await.unwrap();
        let names: Vec<&str> = metrics.iter().map(|m| m.name()).collect();
        assert!(names.contains(&"ram_usage_percent"));
        assert!(names.contains(&"ram_used_mb"));
        assert!(names.contains(&"cpu_usage_percent"));
    }

    #[test]
    fn rounds_to_configured_precision() {
        let collector = LocalCollector::new("dev", &LocalCollectorConfig::default(), 1);
        assert_eq!(collector.round(12.345), 12.3);
    }
}
