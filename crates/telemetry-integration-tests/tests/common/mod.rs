//! Common test utilities for telemetry-ingest integration tests
//!
//! This module provides:
//! - An [`AppState`] builder over a throwaway `sqlx::test`-managed schema
//! - A request helper for driving the router with `tower::ServiceExt::oneshot`
//! - Sample snapshot/metric fixture builders

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use telemetry_ingest::{AppState, ServiceMetrics};
use telemetry_schema::{MetricEntry, Snapshot};
use tower::ServiceExt;

pub const TEST_API_KEY: &str = "test-api-key";

/// Build an [`AppState`] over `pool` with a fixed test API key and reads
/// gated behind it, matching the default (non-public) configuration.
#[allow(dead_code)]
pub fn test_app_state(pool: PgPool) -> AppState {
    test_app_state_with_reads(pool, false)
}

#[allow(dead_code)]
pub fn test_app_state_with_reads(pool: PgPool, public_reads: bool) -> AppState {
    AppState {
        pool,
        api_key: Arc::from(TEST_API_KEY),
        public_reads,
        metrics: Arc::new(ServiceMetrics::default()),
    }
}

/// Issue `method path` with an optional JSON body and the test API key
/// attached, returning the raw response.
#[allow(dead_code)]
pub async fn send(
    app: axum::Router,
    method: &str,
    path: &str,
    body: Option<Value>,
    with_api_key: bool,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if with_api_key {
        builder = builder.header("x-api-key", TEST_API_KEY);
    }

    let request = if let Some(body) = body {
        builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    app.oneshot(request).await.unwrap()
}

/// Parse a response body as JSON, panicking if it isn't valid JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status code");
}

/// A snapshot with one `cpu_usage_percent` metric, ready to POST.
#[allow(dead_code)]
pub fn sample_snapshot(device_id: telemetry_schema::DeviceId) -> Snapshot {
    Snapshot::new(
        device_id,
        vec![MetricEntry::new("cpu_usage_percent", 42.5, "%").unwrap()],
    )
}

/// Register an aggregator named `name` through the HTTP API and return its
/// issued `aggregator_id`.
#[allow(dead_code)]
pub async fn register_aggregator(app: axum::Router, name: &str) -> telemetry_schema::AggregatorId {
    let response = send(
        app,
        "POST",
        "/aggregators",
        Some(serde_json::json!({"name": name})),
        true,
    )
    .await;
    let body = json_body(response).await;
    body["aggregator_id"]
        .as_str()
        .unwrap()
        .parse()
        .expect("server returned a valid aggregator_id")
}

/// Register a device under `aggregator_id` through the HTTP API and return
/// its issued `device_id`.
#[allow(dead_code)]
pub async fn register_device(
    app: axum::Router,
    aggregator_id: telemetry_schema::AggregatorId,
    name: &str,
    source: &str,
) -> telemetry_schema::DeviceId {
    let response = send(
        app,
        "POST",
        "/devices",
        Some(serde_json::json!({
            "aggregator_id": aggregator_id.to_string(),
            "name": name,
            "source": source,
        })),
        true,
    )
    .await;
    let body = json_body(response).await;
    body["device_id"]
        .as_str()
        .unwrap()
        .parse()
        .expect("server returned a valid device_id")
}
