//! Aggregator and device registration against a real Postgres schema.

mod common;

use axum::http::StatusCode;
use common::{assert_status, json_body, send, test_app_state};
use sqlx::PgPool;
use telemetry_ingest::create_router;

#[sqlx::test(migrations = "../telemetry-server/migrations")]
async fn registering_an_aggregator_twice_is_idempotent(pool: PgPool) {
    let app = create_router(test_app_state(pool));

    let first = send(
        app.clone(),
        "POST",
        "/aggregators",
        Some(serde_json::json!({"name": "edge-1"})),
        true,
    )
    .await;
    assert_status(&first, StatusCode::CREATED);
    let first_id = json_body(first).await["aggregator_id"].as_str().unwrap().to_string();

    let second = send(
        app,
        "POST",
        "/aggregators",
        Some(serde_json::json!({"name": "edge-1"})),
        true,
    )
    .await;
    assert_status(&second, StatusCode::OK);
    let second_id = json_body(second).await["aggregator_id"].as_str().unwrap().to_string();

    assert_eq!(first_id, second_id);
}

#[sqlx::test(migrations = "../telemetry-server/migrations")]
async fn registering_an_aggregator_without_api_key_is_rejected(pool: PgPool) {
    let app = create_router(test_app_state(pool));

    let response = send(
        app,
        "POST",
        "/aggregators",
        Some(serde_json::json!({"name": "edge-1"})),
        false,
    )
    .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../telemetry-server/migrations")]
async fn registering_a_device_under_an_unknown_aggregator_returns_404(pool: PgPool) {
    let app = create_router(test_app_state(pool));

    let response = send(
        app,
        "POST",
        "/devices",
        Some(serde_json::json!({
            "aggregator_id": uuid::Uuid::new_v4().to_string(),
            "name": "local",
            "source": "local",
        })),
        true,
    )
    .await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../telemetry-server/migrations")]
async fn registering_a_device_under_a_known_aggregator_succeeds(pool: PgPool) {
    let app = create_router(test_app_state(pool));

    let aggregator = send(
        app.clone(),
        "POST",
        "/aggregators",
        Some(serde_json::json!({"name": "edge-1"})),
        true,
    )
    .await;
    let aggregator_id = json_body(aggregator).await["aggregator_id"]
        .as_str()
        .unwrap()
        .to_string();

    let device = send(
        app,
        "POST",
        "/devices",
        Some(serde_json::json!({
            "aggregator_id": aggregator_id,
            "name": "local",
            "source": "local",
        })),
        true,
    )
    .await;
    assert_status(&device, StatusCode::CREATED);
    assert!(json_body(device).await["device_id"].as_str().is_some());
}
