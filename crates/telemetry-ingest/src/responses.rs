//! Request and response DTOs for the ingestion and dashboard-read endpoints.

use serde::{Deserialize, Serialize};
use telemetry_schema::{AggregatorId, DeviceId, Snapshot, Source};

/// `POST /aggregators` request body.
#[derive(Debug, Deserialize)]
pub struct RegisterAggregatorRequest {
    pub name: String,
}

/// `POST /aggregators` response body.
#[derive(Debug, Serialize)]
pub struct RegisterAggregatorResponse {
    pub aggregator_id: AggregatorId,
}

/// `POST /devices` request body.
#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub aggregator_id: AggregatorId,
    pub name: String,
    pub source: Source,
}

/// `POST /devices` response body.
#[derive(Debug, Serialize)]
pub struct RegisterDeviceResponse {
    pub device_id: DeviceId,
}

/// `GET /api/metrics` query parameters.
#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub device_id: Option<DeviceId>,
    pub source: Option<Source>,
    pub since: Option<f64>,
    pub limit: Option<u32>,
}

/// `GET /api/metrics` response row: one snapshot reassembled from its
/// `snapshots` row and the `metrics` rows joined to it.
#[derive(Debug, Serialize)]
pub struct MetricsQueryResponse {
    pub snapshots: Vec<Snapshot>,
}

/// `GET /health` response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}
