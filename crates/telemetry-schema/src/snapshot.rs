use crate::{DeviceId, MetricEntry, SnapshotId, UnixTimestamp};
use serde::{Deserialize, Serialize};

/// One sampling result — the atomic unit of delivery through the pipeline.
///
/// Immutable once constructed. `snapshot_id` is the idempotency key the
/// ingestion server deduplicates on; two POSTs carrying the same ID must
/// never produce two rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: SnapshotId,
    pub device_id: DeviceId,
    #[serde(rename = "timestamp")]
    pub collected_at: UnixTimestamp,
    pub metrics: Vec<MetricEntry>,
}

impl Snapshot {
    /// Build a snapshot for `device_id`, stamping a fresh ID and the
    /// current time as `collected_at`.
    pub fn new(device_id: DeviceId, metrics: Vec<MetricEntry>) -> Self {
        Self {
            snapshot_id: SnapshotId::new(),
            device_id,
            collected_at: UnixTimestamp::now(),
            metrics,
        }
    }
}
