//! The queue-internal envelope wrapping a snapshot with retry state.

use serde::{Deserialize, Serialize};
use telemetry_schema::{Snapshot, UnixTimestamp};

/// Queue-internal wrapper carrying retry metadata around a snapshot.
///
/// Never visible outside the queue — callers put and the server receives
/// `Snapshot`s; only the broker and worker see the envelope. Serialized
/// wholesale onto the broker so in-flight envelopes remain readable across
/// aggregator version changes (the payload is JSON-in-JSON, by design).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub payload: Snapshot,
    pub retry_count: u32,
    pub first_queued_at: UnixTimestamp,
    pub last_error: Option<String>,
}

impl Envelope {
    pub fn new(payload: Snapshot) -> Self {
        Self {
            payload,
            retry_count: 0,
            first_queued_at: UnixTimestamp::now(),
            last_error: None,
        }
    }

    pub fn snapshot_id(&self) -> String {
        self.payload.snapshot_id.to_string()
    }
}

/// Sizes of the three broker-backed structures.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrokerStats {
    pub pending: u64,
    pub retry: u64,
    pub failed: u64,
}
