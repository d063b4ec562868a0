//! # Telemetry Schema
//!
//! Wire and domain value types shared by every other crate in the
//! telemetry pipeline: metric readings, snapshots, and the typed
//! identifiers that bind aggregators, devices, and snapshots together.
//!
//! Construction of every type in this crate validates its invariants and
//! returns `Result`, never panics — see [`ValidationError`].

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

mod ids;
mod metric;
mod snapshot;
mod timestamp;

pub use ids::{AggregatorId, DeviceId, IdParseError, SnapshotId};
pub use metric::MetricEntry;
pub use snapshot::Snapshot;
pub use timestamp::UnixTimestamp;

/// Errors raised when constructing a schema value fails its invariants.
///
/// Mirrors the shape the rest of the pipeline uses for validation errors:
/// one variant per failure class, never a bag of strings.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: &'static str },

    #[error("{field} must be at most {max_length} characters, got {actual}")]
    TooLong {
        field: &'static str,
        max_length: usize,
        actual: usize,
    },

    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

/// A named source describing what kind of device produced a snapshot.
///
/// Not an enum: new sources (`local`, `wikipedia`, `transport`, ...) are
/// added by deploying a new collector, not by touching this crate.
pub type Source = String;

/// An aggregator process identity, as issued by the ingestion server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregator {
    pub aggregator_id: AggregatorId,
    pub name: String,
}

/// A logical data source registered under an aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_id: DeviceId,
    pub aggregator_id: AggregatorId,
    pub name: String,
    pub source: Source,
}

pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs_f64()
}

// Re-exported so downstream crates don't need a direct `uuid` dependency
// just to accept or produce identifiers.
pub use uuid::Uuid as RawUuid;
