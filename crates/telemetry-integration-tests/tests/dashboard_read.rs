//! `GET /api/metrics`: ordering, filtering, and the `public_reads` switch.

mod common;

use axum::http::StatusCode;
use common::{
    assert_status, json_body, register_aggregator, register_device, send, test_app_state,
    test_app_state_with_reads,
};
use sqlx::PgPool;
use telemetry_ingest::create_router;
use telemetry_schema::{MetricEntry, Snapshot};

#[sqlx::test(migrations = "../telemetry-server/migrations")]
async fn snapshots_are_returned_ordered_by_collected_at(pool: PgPool) {
    let app = create_router(test_app_state(pool));

    let aggregator_id = register_aggregator(app.clone(), "edge-1").await;
    let device_id = register_device(app.clone(), aggregator_id, "local", "local").await;

    let earlier = Snapshot {
        snapshot_id: telemetry_schema::SnapshotId::new(),
        device_id,
        collected_at: telemetry_schema::UnixTimestamp::from_secs(1000.0),
        metrics: vec![MetricEntry::new("cpu_usage_percent", 10.0, "%").unwrap()],
    };
    let later = Snapshot {
        snapshot_id: telemetry_schema::SnapshotId::new(),
        device_id,
        collected_at: telemetry_schema::UnixTimestamp::from_secs(2000.0),
        metrics: vec![MetricEntry::new("cpu_usage_percent", 20.0, "%").unwrap()],
    };

    for snapshot in [&later, &earlier] {
        let response = send(
            app.clone(),
            "POST",
            "/api/metrics",
            Some(serde_json::to_value(snapshot).unwrap()),
            true,
        )
        .await;
        assert_status(&response, StatusCode::CREATED);
    }

    let response = send(
        app,
        "GET",
        &format!("/api/metrics?device_id={device_id}"),
        None,
        true,
    )
    .await;
    assert_status(&response, StatusCode::OK);

    let body = json_body(response).await;
    let snapshots = body["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0]["timestamp"], 1000.0);
    assert_eq!(snapshots[1]["timestamp"], 2000.0);
}

#[sqlx::test(migrations = "../telemetry-server/migrations")]
async fn reads_require_an_api_key_unless_public_reads_is_set(pool: PgPool) {
    let app = create_router(test_app_state(pool));

    let response = send(app, "GET", "/api/metrics", None, false).await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../telemetry-server/migrations")]
async fn public_reads_allows_anonymous_get_requests(pool: PgPool) {
    let app = create_router(test_app_state_with_reads(pool, true));

    let response = send(app, "GET", "/api/metrics", None, false).await;
    assert_status(&response, StatusCode::OK);
}
