//! The `Collector` trait: anything that can be sampled on a timer.

use crate::error::CollectorError;
use async_trait::async_trait;
use telemetry_schema::MetricEntry;

/// A metric source sampled periodically by a [`crate::runtime::CollectorRuntime`].
///
/// No base class, no shared mutable state beyond what an implementation
/// chooses to hold — the capability is exactly `{collect, source,
/// device_name}`, matching the "consumes any value that exposes these
/// operations" framing rather than a runtime inheritance hierarchy.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Sample the source once. An `Err` here never stops the runtime —
    /// the caller logs it and waits for the next tick.
    async fn collect(&self) -> Result<Vec<MetricEntry>, CollectorError>;

    /// Source identifier stamped onto every collected snapshot.
    fn source(&self) -> &str;

    /// Human-readable collector identity for logging.
    fn device_name(&self) -> &str;
}
