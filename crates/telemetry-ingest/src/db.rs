//! Postgres access for aggregators, devices, snapshots, and metrics.
//!
//! Grounded on `server/database.py`'s `get_db()` commit/rollback context
//! manager, expressed here as `sqlx::Transaction::commit`/drop-rolls-back.
//! Idempotency on `aggregators.name` and `snapshots.snapshot_id` is enforced
//! with `INSERT ... ON CONFLICT`, never a read-then-write race.

use crate::config::DatabaseConfig;
use crate::errors::IngestError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use telemetry_schema::{AggregatorId, DeviceId, MetricEntry, Snapshot, Source, UnixTimestamp};

const MAX_QUERY_LIMIT: u32 = 1000;
const DEFAULT_QUERY_LIMIT: u32 = 100;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(std::time::Duration::from_secs(config.idle_recycle_seconds))
        .connect(&config.url)
        .await
}

/// Outcome of registering an aggregator — distinguishes 200 (already
/// existed) from 201 (freshly created) without a separate read.
pub struct AggregatorRegistration {
    pub aggregator_id: AggregatorId,
    pub created: bool,
}

pub async fn register_aggregator(
    pool: &PgPool,
    name: &str,
) -> Result<AggregatorRegistration, sqlx::Error> {
    let id = AggregatorId::new();
    let inserted: Option<(uuid::Uuid,)> = sqlx::query_as(
        "INSERT INTO aggregators (aggregator_id, name) VALUES ($1, $2) \
         ON CONFLICT (name) DO NOTHING RETURNING aggregator_id",
    )
    .bind(id.as_uuid())
    .bind(name)
    .fetch_optional(pool)
    .await?;

    if let Some((aggregator_id,)) = inserted {
        return Ok(AggregatorRegistration {
            aggregator_id: AggregatorId::from_uuid(aggregator_id),
            created: true,
        });
    }

    let (aggregator_id,): (uuid::Uuid,) =
        sqlx::query_as("SELECT aggregator_id FROM aggregators WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await?;

    Ok(AggregatorRegistration {
        aggregator_id: AggregatorId::from_uuid(aggregator_id),
        created: false,
    })
}

/// Registers a device under `aggregator_id`. Returns `Ok(None)` if the
/// aggregator does not exist — the caller maps that to `404`.
pub async fn register_device(
    pool: &PgPool,
    aggregator_id: AggregatorId,
    name: &str,
    source: &Source,
) -> Result<Option<DeviceId>, sqlx::Error> {
    let exists: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT aggregator_id FROM aggregators WHERE aggregator_id = $1")
            .bind(aggregator_id.as_uuid())
            .fetch_optional(pool)
            .await?;
    if exists.is_none() {
        return Ok(None);
    }

    let device_id = DeviceId::new();
    sqlx::query(
        "INSERT INTO devices (device_id, aggregator_id, name, source) VALUES ($1, $2, $3, $4)",
    )
    .bind(device_id.as_uuid())
    .bind(aggregator_id.as_uuid())
    .bind(name)
    .bind(source)
    .execute(pool)
    .await?;

    Ok(Some(device_id))
}

/// Result of attempting to ingest a snapshot.
pub enum SnapshotInsertOutcome {
    /// Freshly inserted: the snapshot row and all of its metric rows.
    Inserted,
    /// `snapshot_id` already existed — no rows were re-inserted.
    Duplicate,
    /// `device_id` does not reference a registered device.
    UnknownDevice,
}

/// Inserts one snapshot plus its metric rows in a single transaction,
/// committing only once every row is written. A duplicate `snapshot_id`
/// is detected and reported without a second insert.
pub async fn insert_snapshot(
    pool: &PgPool,
    snapshot: &Snapshot,
) -> Result<SnapshotInsertOutcome, IngestError> {
    let mut tx = pool.begin().await?;

    let device_exists: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT device_id FROM devices WHERE device_id = $1")
            .bind(snapshot.device_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
    if device_exists.is_none() {
        tx.rollback().await?;
        return Ok(SnapshotInsertOutcome::UnknownDevice);
    }

    let inserted: Option<(uuid::Uuid,)> = sqlx::query_as(
        "INSERT INTO snapshots (snapshot_id, device_id, collected_at, received_at) \
         VALUES ($1, $2, $3, $4) ON CONFLICT (snapshot_id) DO NOTHING RETURNING snapshot_id",
    )
    .bind(snapshot.snapshot_id.as_uuid())
    .bind(snapshot.device_id.as_uuid())
    .bind(snapshot.collected_at.as_secs())
    .bind(UnixTimestamp::now().as_secs())
    .fetch_optional(&mut *tx)
    .await?;

    if inserted.is_none() {
        tx.rollback().await?;
        return Ok(SnapshotInsertOutcome::Duplicate);
    }

    for metric in &snapshot.metrics {
        insert_metric(&mut tx, snapshot.snapshot_id.as_uuid(), metric).await?;
    }

    tx.commit().await?;
    Ok(SnapshotInsertOutcome::Inserted)
}

async fn insert_metric(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    snapshot_id: uuid::Uuid,
    metric: &MetricEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO metrics (snapshot_id, metric_name, metric_value, unit) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(snapshot_id)
    .bind(metric.name())
    .bind(metric.value())
    .bind(metric.unit())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Queries snapshots ordered by `collected_at ASC`, joining `devices` when
/// filtering by `source`.
pub async fn query_metrics(
    pool: &PgPool,
    device_id: Option<DeviceId>,
    source: Option<&Source>,
    since: Option<f64>,
    limit: Option<u32>,
) -> Result<Vec<Snapshot>, sqlx::Error> {
    let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(MAX_QUERY_LIMIT);

    let rows: Vec<(uuid::Uuid, uuid::Uuid, f64)> = sqlx::query_as(
        "SELECT s.snapshot_id, s.device_id, s.collected_at \
         FROM snapshots s JOIN devices d ON d.device_id = s.device_id \
         WHERE ($1::uuid IS NULL OR s.device_id = $1) \
           AND ($2::text IS NULL OR d.source = $2) \
           AND ($3::double precision IS NULL OR s.collected_at > $3) \
         ORDER BY s.collected_at ASC \
         LIMIT $4",
    )
    .bind(device_id.map(|d| d.as_uuid()))
    .bind(source)
    .bind(since)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut snapshots = Vec::with_capacity(rows.len());
    for (snapshot_id, device_id, collected_at) in rows {
        let metric_rows: Vec<(String, f64, String)> = sqlx::query_as(
            "SELECT metric_name, metric_value, unit FROM metrics WHERE snapshot_id = $1",
        )
        .bind(snapshot_id)
        .fetch_all(pool)
        .await?;

        let metrics = metric_rows
            .into_iter()
            .filter_map(|(name, value, unit)| MetricEntry::new(name, value, unit).ok())
            .collect();

        snapshots.push(Snapshot {
            snapshot_id: snapshot_id.into(),
            device_id: device_id.into(),
            collected_at: UnixTimestamp::from_secs(collected_at),
            metrics,
        });
    }

    Ok(snapshots)
}
