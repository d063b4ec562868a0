//! # Telemetry Ingest
//!
//! The HTTP ingestion and dashboard-read service: an axum [`Router`]
//! exposing `POST /aggregators`, `POST /devices`, `POST /api/metrics`,
//! `GET /api/metrics`, and `GET /health`, backed by Postgres via `sqlx`.

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod responses;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument, warn};

pub use config::{IngestConfig, LoggingConfig};
pub use errors::{ConfigError, IngestError, ServiceError};
pub use metrics::ServiceMetrics;
pub use responses::*;

use telemetry_schema::Snapshot;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub api_key: Arc<str>,
    pub public_reads: bool,
    pub metrics: Arc<ServiceMetrics>,
}

/// Create the HTTP router with all endpoints and middleware layers.
pub fn create_router(state: AppState) -> Router {
    let write_routes = Router::new()
        .route("/aggregators", post(register_aggregator))
        .route("/devices", post(register_device))
        .route("/api/metrics", post(post_metrics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let read_routes = Router::new().route("/api/metrics", get(get_metrics));
    let read_routes = if state.public_reads {
        read_routes
    } else {
        read_routes.layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
    };

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(write_routes)
        .merge(read_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Build the pool and start the HTTP server with graceful shutdown on
/// SIGINT/SIGTERM.
pub async fn start_server(config: IngestConfig) -> Result<(), ServiceError> {
    config.validate().map_err(ServiceError::Configuration)?;
    let pool = db::create_pool(&config.database).await?;
    start_server_with_pool(config, pool).await
}

/// Start the HTTP server against an already-connected pool (so the caller
/// can run migrations against the same pool first).
pub async fn start_server_with_pool(config: IngestConfig, pool: PgPool) -> Result<(), ServiceError> {
    config.validate().map_err(ServiceError::Configuration)?;

    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("failed to initialize metrics: {e}"),
        })
    })?;

    let state = AppState {
        pool,
        api_key: Arc::from(config.security.api_key.as_str()),
        public_reads: config.security.public_reads,
        metrics,
    };
    let app = create_router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!(%addr, "starting ingestion HTTP server");

    let shutdown_timeout = std::time::Duration::from_secs(config.server.shutdown_timeout_seconds);
    let shutdown_signal = async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!(timeout_s = shutdown_timeout.as_secs(), "received SIGINT, shutting down"),
            _ = terminate => info!(timeout_s = shutdown_timeout.as_secs(), "received SIGTERM, shutting down"),
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("ingestion HTTP server shut down");
    Ok(())
}

// ============================================================================
// Middleware
// ============================================================================

/// Rejects write requests (and, unless `public_reads` is set, read requests)
/// whose `X-API-Key` header does not match the configured secret.
async fn require_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    match provided {
        Some(key) if key == state.api_key.as_ref() => next.run(request).await,
        _ => {
            state.metrics.auth_failures_total.inc();
            IngestError::Unauthorized.into_response()
        }
    }
}

async fn request_logging_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();

    if status.is_server_error() {
        tracing::error!(%method, %uri, %status, duration_ms = %duration.as_millis(), "request failed");
    } else {
        info!(%method, %uri, %status, duration_ms = %duration.as_millis(), "request completed");
    }

    response
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /aggregators` — idempotent by `name`. Returns 201 when a new row
/// was created, 200 when the name already existed.
#[instrument(skip(state))]
async fn register_aggregator(
    State(state): State<AppState>,
    Json(body): Json<RegisterAggregatorRequest>,
) -> Result<Response, IngestError> {
    if body.name.trim().is_empty() {
        return Err(IngestError::Validation(
            telemetry_schema::ValidationError::Required { field: "name" },
        ));
    }

    let registration = db::register_aggregator(&state.pool, &body.name).await?;
    state.metrics.aggregators_registered_total.inc();

    let status = if registration.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = RegisterAggregatorResponse {
        aggregator_id: registration.aggregator_id,
    };
    Ok((status, Json(body)).into_response())
}

/// `POST /devices` — `404` if the aggregator does not exist.
#[instrument(skip(state))]
async fn register_device(
    State(state): State<AppState>,
    Json(body): Json<RegisterDeviceRequest>,
) -> Result<Response, IngestError> {
    if body.name.trim().is_empty() {
        return Err(IngestError::Validation(
            telemetry_schema::ValidationError::Required { field: "name" },
        ));
    }

    let device_id = db::register_device(&state.pool, body.aggregator_id, &body.name, &body.source)
        .await?
        .ok_or_else(|| IngestError::AggregatorNotFound {
            aggregator_id: body.aggregator_id.to_string(),
        })?;
    state.metrics.devices_registered_total.inc();

    Ok((
        StatusCode::CREATED,
        Json(RegisterDeviceResponse { device_id }),
    )
        .into_response())
}

/// `POST /api/metrics` — validates the device exists, inserts the snapshot
/// plus its metrics in one transaction. Returns `2xx` only after commit; a
/// duplicate `snapshot_id` is detected and returns `2xx` without
/// re-insertion.
#[instrument(skip(state, snapshot), fields(snapshot_id = %snapshot.snapshot_id))]
async fn post_metrics(
    State(state): State<AppState>,
    Json(snapshot): Json<Snapshot>,
) -> Result<Response, IngestError> {
    state.metrics.ingest_requests_total.inc();

    match db::insert_snapshot(&state.pool, &snapshot).await? {
        db::SnapshotInsertOutcome::Inserted => {
            state.metrics.snapshots_ingested_total.inc();
            state
                .metrics
                .metrics_ingested_total
                .inc_by(snapshot.metrics.len() as u64);
            Ok(StatusCode::CREATED.into_response())
        }
        db::SnapshotInsertOutcome::Duplicate => {
            warn!(snapshot_id = %snapshot.snapshot_id, "duplicate snapshot_id, not re-inserted");
            Ok(StatusCode::OK.into_response())
        }
        db::SnapshotInsertOutcome::UnknownDevice => {
            Err(IngestError::DeviceNotFound {
                device_id: snapshot.device_id.to_string(),
            })
        }
    }
}

/// `GET /api/metrics` — filtered, ordered by `collected_at ASC`.
#[instrument(skip(state))]
async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<MetricsQueryResponse>, IngestError> {
    let snapshots = db::query_metrics(
        &state.pool,
        query.device_id,
        query.source.as_ref(),
        query.since,
        query.limit,
    )
    .await?;
    Ok(Json(MetricsQueryResponse { snapshots }))
}

/// `GET /health` — liveness, backed by a pool acquire.
async fn handle_health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => Ok(Json(HealthResponse {
            status: "healthy".to_string(),
        })),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn metrics_endpoint(State(_state): State<AppState>) -> Result<String, StatusCode> {
    use prometheus::TextEncoder;
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
