//! Prometheus metrics for the ingestion and dashboard-read service.

use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::Arc;
use std::time::Duration;

/// Service metrics for observability, exposed at `GET /metrics`.
#[derive(Debug)]
pub struct ServiceMetrics {
    pub http_requests_total: IntCounter,
    pub http_request_duration: Histogram,

    pub ingest_requests_total: IntCounter,
    pub ingest_validation_failures_total: IntCounter,
    pub snapshots_ingested_total: IntCounter,
    pub duplicate_snapshots_total: IntCounter,
    pub metrics_ingested_total: IntCounter,

    pub aggregators_registered_total: IntCounter,
    pub devices_registered_total: IntCounter,

    pub auth_failures_total: IntCounter,
    pub errors_by_status: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        use prometheus::{register_histogram, register_int_counter, register_int_counter_vec};

        Ok(Arc::new(Self {
            http_requests_total: register_int_counter!(
                "http_requests_total",
                "Total number of HTTP requests"
            )?,
            http_request_duration: register_histogram!(
                "http_request_duration_seconds",
                "HTTP request processing time",
                vec![0.001, 0.01, 0.1, 1.0, 10.0]
            )?,
            ingest_requests_total: register_int_counter!(
                "ingest_requests_total",
                "Total POST /api/metrics requests received"
            )?,
            ingest_validation_failures_total: register_int_counter!(
                "ingest_validation_failures_total",
                "Snapshot bodies rejected for schema violations"
            )?,
            snapshots_ingested_total: register_int_counter!(
                "snapshots_ingested_total",
                "Snapshot rows committed to the database"
            )?,
            duplicate_snapshots_total: register_int_counter!(
                "duplicate_snapshots_total",
                "Snapshots seen with a snapshot_id already present in the database"
            )?,
            metrics_ingested_total: register_int_counter!(
                "metrics_ingested_total",
                "Individual metric rows committed to the database"
            )?,
            aggregators_registered_total: register_int_counter!(
                "aggregators_registered_total",
                "Aggregator registrations processed (including idempotent repeats)"
            )?,
            devices_registered_total: register_int_counter!(
                "devices_registered_total",
                "Device registrations processed"
            )?,
            auth_failures_total: register_int_counter!(
                "auth_failures_total",
                "Requests rejected for a missing or incorrect X-API-Key"
            )?,
            errors_by_status: register_int_counter_vec!(
                "ingest_errors_by_status_total",
                "Error responses grouped by HTTP status code",
                &["status"]
            )?,
        }))
    }

    pub fn record_http_request(&self, duration: Duration) {
        self.http_requests_total.inc();
        self.http_request_duration.observe(duration.as_secs_f64());
    }

    pub fn record_error_status(&self, status: u16) {
        self.errors_by_status
            .with_label_values(&[&status.to_string()])
            .inc();
    }
}

impl Default for ServiceMetrics {
    /// Stub for tests: registers under name-unique-per-call metric names so
    /// building multiple [`AppState`](crate::AppState)s in one test binary
    /// doesn't collide on the global registry. Do not use in production;
    /// use [`ServiceMetrics::new`].
    fn default() -> Self {
        use prometheus::{register_histogram, register_int_counter, register_int_counter_vec};

        let suffix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();

        Self {
            http_requests_total: register_int_counter!(
                format!("http_requests_total_test_{suffix}"),
                "Test HTTP requests"
            )
            .unwrap(),
            http_request_duration: register_histogram!(
                format!("http_request_duration_seconds_test_{suffix}"),
                "Test HTTP duration",
                vec![]
            )
            .unwrap(),
            ingest_requests_total: register_int_counter!(
                format!("ingest_requests_total_test_{suffix}"),
                "Test ingest requests"
            )
            .unwrap(),
            ingest_validation_failures_total: register_int_counter!(
                format!("ingest_validation_failures_total_test_{suffix}"),
                "Test ingest validation failures"
            )
            .unwrap(),
            snapshots_ingested_total: register_int_counter!(
                format!("snapshots_ingested_total_test_{suffix}"),
                "Test snapshots ingested"
            )
            .unwrap(),
            duplicate_snapshots_total: register_int_counter!(
                format!("duplicate_snapshots_total_test_{suffix}"),
                "Test duplicate snapshots"
            )
            .unwrap(),
            metrics_ingested_total: register_int_counter!(
                format!("metrics_ingested_total_test_{suffix}"),
                "Test metrics ingested"
            )
            .unwrap(),
            aggregators_registered_total: register_int_counter!(
                format!("aggregators_registered_total_test_{suffix}"),
                "Test aggregators registered"
            )
            .unwrap(),
            devices_registered_total: register_int_counter!(
                format!("devices_registered_total_test_{suffix}"),
                "Test devices registered"
            )
            .unwrap(),
            auth_failures_total: register_int_counter!(
                format!("auth_failures_total_test_{suffix}"),
                "Test auth failures"
            )
            .unwrap(),
            errors_by_status: register_int_counter_vec!(
                format!("ingest_errors_by_status_total_test_{suffix}"),
                "Test errors by status",
                &["status"]
            )
            .unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_registers_without_error() {
        // Uses the default global registry; subsequent calls in the same
        // process would conflict, so this is exercised once per test binary.
        let metrics = ServiceMetrics::new();
        assert!(metrics.is_ok());
    }
}
