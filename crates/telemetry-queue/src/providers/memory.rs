//! In-process broker backing tests and single-process development runs.
//!
//! Grounded on the teacher's `InMemoryProvider`
//! (`telemetry-queue`'s former `providers/memory.rs`), which held its state
//! behind a single `Mutex`-guarded `QueueStorage`; this keeps that shape but
//! drops the session/visibility-timeout machinery that PENDING/RETRY/FAILED
//! never needed.

use crate::broker::Broker;
use crate::envelope::{BrokerStats, Envelope};
use crate::error::BrokerError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use telemetry_schema::UnixTimestamp;
use tokio::sync::Notify;

struct Storage {
    pending: VecDeque<Envelope>,
    retry: Vec<(UnixTimestamp, Envelope)>,
    failed: Vec<Envelope>,
}

/// `Broker` backed by in-process `Vec`/`VecDeque`s. Not durable across
/// restarts; intended for tests and for running the whole pipeline on a
/// single machine without a Redis instance.
pub struct MemoryBroker {
    storage: Mutex<Storage>,
    notify: Notify,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            storage: Mutex::new(Storage {
                pending: VecDeque::new(),
                retry: Vec::new(),
                failed: Vec::new(),
            }),
            notify: Notify::new(),
        }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn push_pending(&self, envelope: Envelope) -> Result<(), BrokerError> {
        self.storage
            .lock()
            .expect("memory broker lock poisoned")
            .pending
            .push_front(envelope);
        self.notify.notify_one();
        Ok(())
    }

    async fn pop_pending(&self, wait: Duration) -> Result<Option<Envelope>, BrokerError> {
        if let Some(envelope) = self
            .storage
            .lock()
            .expect("memory broker lock poisoned")
            .pending
            .pop_back()
        {
            return Ok(Some(envelope));
        }
        let _ = tokio::time::timeout(wait, self.notify.notified()).await;
        Ok(self
            .storage
            .lock()
            .expect("memory broker lock poisoned")
            .pending
            .pop_back())
    }

    async fn due_retries(
        &self,
        now: UnixTimestamp,
        limit: usize,
    ) -> Result<Vec<Envelope>, BrokerError> {
        let storage = self.storage.lock().expect("memory broker lock poisoned");
        Ok(storage
            .retry
            .iter()
            .filter(|(at, _)| *at <= now)
            .take(limit)
            .map(|(_, envelope)| envelope.clone())
            .collect())
    }

    async fn remove_retry(&self, envelope: &Envelope) -> Result<(), BrokerError> {
        let mut storage = self.storage.lock().expect("memory broker lock poisoned");
        let target = envelope.snapshot_id();
        storage
            .retry
            .retain(|(_, candidate)| candidate.snapshot_id() != target);
        Ok(())
    }

    async fn schedule_retry(&self, envelope: Envelope, at: UnixTimestamp) -> Result<(), BrokerError> {
        self.storage
            .lock()
            .expect("memory broker lock poisoned")
            .retry
            .push((at, envelope));
        Ok(())
    }

    async fn push_failed(&self, envelope: Envelope) -> Result<(), BrokerError> {
        self.storage
            .lock()
            .expect("memory broker lock poisoned")
            .failed
            .push(envelope);
        Ok(())
    }

    async fn stats(&self) -> Result<BrokerStats, BrokerError> {
        let storage = self.storage.lock().expect("memory broker lock poisoned");
        Ok(BrokerStats {
            pending: storage.pending.len() as u64,
            retry: storage.retry.len() as u64,
            failed: storage.failed.len() as u64,
        })
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}
