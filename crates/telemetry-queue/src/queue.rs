//! The public `UploadQueue` contract wrapping a [`Broker`] and worker task.
//!
//! Grounded on `base_queue.py`'s abstract `UploadQueue` (`start`/`stop`/
//! `put`/`get_stats`) and `redis_queue.py`'s concrete lifecycle: `start`
//! spawns the worker, `stop` flips the shutdown flag and joins with a
//! timeout, mirrored here as `tokio::time::timeout` around `JoinHandle`.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::config::UploadQueueConfig;
use crate::envelope::{BrokerStats, Envelope};
use crate::error::QueueError;
use crate::providers::{MemoryBroker, RedisBroker};
use crate::worker::{run_once, ShutdownFlag};
use std::sync::Arc;
use std::time::Duration;
use telemetry_schema::Snapshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running upload queue: accepts snapshots via [`UploadQueue::put`] and
/// drives them to the configured ingestion endpoint from a background task.
pub struct UploadQueue {
    broker: Arc<dyn crate::broker::Broker>,
    config: UploadQueueConfig,
    shutdown: Arc<ShutdownFlag>,
    worker_handle: Option<JoinHandle<()>>,
}

impl UploadQueue {
    /// Build a queue backed by [`RedisBroker`] at `config.redis_url()`.
    pub async fn with_redis(config: UploadQueueConfig) -> Result<Self, QueueError> {
        let broker = RedisBroker::connect(&config.redis_url()).await?;
        Ok(Self::new(Arc::new(broker), config))
    }

    /// Build a queue backed by an in-process [`MemoryBroker`], for tests and
    /// single-process development runs.
    pub fn with_memory(config: UploadQueueConfig) -> Self {
        Self::new(Arc::new(MemoryBroker::new()), config)
    }

    fn new(broker: Arc<dyn crate::broker::Broker>, config: UploadQueueConfig) -> Self {
        Self {
            broker,
            config,
            shutdown: ShutdownFlag::new(),
            worker_handle: None,
        }
    }

    /// Queue a snapshot for upload. Returns `true` once the envelope is
    /// durably recorded by the broker, `false` if the broker rejected it —
    /// never blocks on the HTTP upload itself.
    pub async fn put(&self, snapshot: Snapshot) -> bool {
        match self.broker.push_pending(Envelope::new(snapshot)).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to enqueue snapshot");
                false
            }
        }
    }

    pub async fn stats(&self) -> Result<BrokerStats, QueueError> {
        self.broker.stats().await.map_err(QueueError::from)
    }

    /// Spawn the background worker task. Calling this twice without an
    /// intervening `stop` returns [`QueueError::AlreadyRunning`].
    pub fn start(&mut self) -> Result<(), QueueError> {
        if self.worker_handle.is_some() {
            return Err(QueueError::AlreadyRunning);
        }

        let broker = Arc::clone(&self.broker);
        let config = self.config.clone();
        let shutdown = Arc::clone(&self.shutdown);
        self.shutdown.clear();

        self.worker_handle = Some(tokio::spawn(async move {
            let http = reqwest::Client::new();
            let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
            info!("upload queue worker started");
            while !shutdown.is_set() {
                let processed = run_once(broker.as_ref(), &http, &breaker, &config).await;
                if !processed {
                    tokio::time::sleep(config.worker_sleep).await;
                }
            }
            info!("upload queue worker stopped");
        }));

        Ok(())
    }

    /// Signal the worker to stop and wait up to five seconds for it to exit.
    pub async fn stop(&mut self) -> Result<(), QueueError> {
        self.shutdown.signal();
        if let Some(handle) = self.worker_handle.take() {
            match tokio::time::timeout(STOP_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => warn!(%join_err, "worker task panicked"),
                Err(_) => return Err(QueueError::ShutdownTimedOut),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_schema::{DeviceId, MetricEntry};

    fn sample_snapshot() -> Snapshot {
        let metric = MetricEntry::new("cpu_percent", 42.0, "percent").unwrap();
        Snapshot::new(DeviceId::new(), vec![metric])
    }

    #[tokio::test]
    async fn put_increments_pending_stats() {
        let config = UploadQueueConfig::default();
        let queue = UploadQueue::with_memory(config);
        assert!(queue.put(sample_snapshot()).await);
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test]
    async fn start_twice_without_stop_errors() {
        let config = UploadQueueConfig::default();
        let mut queue = UploadQueue::with_memory(config);
        queue.start().unwrap();
        let second = queue.start();
        assert!(matches!(second, Err(QueueError::AlreadyRunning)));
        queue.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let config = UploadQueueConfig::default();
        let mut queue = UploadQueue::with_memory(config);
        queue.stop().await.unwrap();
    }
}
