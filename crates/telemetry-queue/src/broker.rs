//! The broker abstraction: PENDING FIFO + RETRY scored set + FAILED list.
//!
//! Narrowed from the teacher's generic, session-aware `QueueProvider` trait
//! (built for SQS/Service Bus with visibility timeouts) down to exactly the
//! three structures this system needs. A single consumer drains PENDING;
//! horizontal scaling of the worker is out of scope.

use crate::envelope::{BrokerStats, Envelope};
use crate::error::BrokerError;
use async_trait::async_trait;
use std::time::Duration;
use telemetry_schema::UnixTimestamp;

/// Durable storage backing the upload queue.
///
/// Implementations must make every individual operation atomic; the design
/// never relies on multi-key transactions across PENDING/RETRY/FAILED.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append an envelope to the head of PENDING.
    async fn push_pending(&self, envelope: Envelope) -> Result<(), BrokerError>;

    /// Pop one envelope from the tail of PENDING, waiting up to `wait` for
    /// one to become available. `Ok(None)` means the queue was empty.
    async fn pop_pending(&self, wait: Duration) -> Result<Option<Envelope>, BrokerError>;

    /// Fetch up to `limit` envelopes from RETRY whose score (retry-eligible
    /// time) is `<= now`, without removing them.
    async fn due_retries(
        &self,
        now: UnixTimestamp,
        limit: usize,
    ) -> Result<Vec<Envelope>, BrokerError>;

    /// Remove a specific envelope from RETRY. Called after `due_retries`
    /// returns it, immediately before re-enqueuing to PENDING — the only
    /// path by which an envelope leaves RETRY for PENDING.
    async fn remove_retry(&self, envelope: &Envelope) -> Result<(), BrokerError>;

    /// Insert an envelope into RETRY, eligible for redelivery at `at`.
    async fn schedule_retry(&self, envelope: Envelope, at: UnixTimestamp) -> Result<(), BrokerError>;

    /// Move an envelope that exhausted its retries (or hit a permanent
    /// error) into FAILED, for operator inspection.
    async fn push_failed(&self, envelope: Envelope) -> Result<(), BrokerError>;

    /// Current sizes of PENDING, RETRY, and FAILED.
    async fn stats(&self) -> Result<BrokerStats, BrokerError>;

    /// Cheap reachability probe used by the orchestrator's startup
    /// handshake and by the worker's outer-loop recovery.
    async fn ping(&self) -> Result<(), BrokerError>;
}
