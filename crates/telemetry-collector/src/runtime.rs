//! The collector runtime: ties a [`Collector`] to a timer, a state machine,
//! and the upload queue.
//!
//! Grounded on `base_data_collector.py`'s `_collection_loop`/`start`/`stop`:
//! a background loop samples on an interval, swallows per-tick errors, and
//! sleeps in one-second increments so shutdown is never more than ~1s late.
//! The thread + `threading.Event`-shaped control there becomes a `tokio`
//! task plus an `Arc<RwLock<RuntimeState>>`, mirroring the way the teacher
//! guards `DefaultCircuitBreaker`'s internal state.

use crate::collector::Collector;
use crate::error::RuntimeError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use telemetry_queue::UploadQueue;
use telemetry_schema::{DeviceId, Snapshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    New,
    Running,
    Stopping,
    Stopped,
}

/// Owns the background task sampling a single [`Collector`] on an interval
/// and forwarding each [`Snapshot`] to the shared upload queue.
pub struct CollectorRuntime<C: Collector + 'static> {
    collector: Arc<C>,
    device_id: DeviceId,
    interval: Duration,
    queue: Arc<UploadQueue>,
    state: Arc<RwLock<RuntimeState>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<C: Collector + 'static> CollectorRuntime<C> {
    pub fn new(
        collector: C,
        device_id: DeviceId,
        interval: Duration,
        queue: Arc<UploadQueue>,
    ) -> Self {
        Self {
            collector: Arc::new(collector),
            device_id,
            interval,
            queue,
            state: Arc::new(RwLock::new(RuntimeState::New)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn state(&self) -> RuntimeState {
        *self.state.read().expect("runtime state lock poisoned")
    }

    /// Spawn the sampling loop. `start()` from any state but `New` —
    /// including `Stopped`, which a bare running-flag check would let
    /// through — is a no-op that logs a warning instead of restarting.
    #[instrument(skip(self), fields(source = self.collector.source()))]
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if self.state() != RuntimeState::New {
            tracing::warn!(state = ?self.state(), source = self.collector.source(), "start() called outside New state, ignoring");
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        *self.state.write().expect("runtime state lock poisoned") = RuntimeState::Running;

        let collector = Arc::clone(&self.collector);
        let device_id = self.device_id;
        let interval = self.interval;
        let queue = Arc::clone(&self.queue);
        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);

        self.handle = Some(tokio::spawn(async move {
            info!(source = collector.source(), device = collector.device_name(), "collector started");
            while running.load(Ordering::SeqCst) {
                sample_once(collector.as_ref(), device_id, queue.as_ref()).await;
                interruptible_sleep(interval, &running).await;
            }
            *state.write().expect("runtime state lock poisoned") = RuntimeState::Stopped;
            info!(source = collector.source(), "collector stopped");
        }));

        Ok(())
    }

    /// Signal the loop to stop and wait for the task to exit. Idempotent:
    /// calling `stop()` from `New` or `Stopped` is a no-op.
    pub async fn stop(&mut self) -> Result<(), RuntimeError> {
        if matches!(self.state(), RuntimeState::New | RuntimeState::Stopped) {
            return Ok(());
        }
        self.running.store(false, Ordering::SeqCst);
        *self.state.write().expect("runtime state lock poisoned") = RuntimeState::Stopping;
        if let Some(handle) = self.handle.take() {
            if let Err(join_err) = handle.await {
                error!(%join_err, "collector task panicked during shutdown");
            }
        }
        Ok(())
    }
}

async fn sample_once(collector: &dyn Collector, device_id: DeviceId, queue: &UploadQueue) {
    match collector.collect().await {
        Ok(metrics) => {
            debug!(
                source = collector.source(),
                metric_count = metrics.len(),
                "collected metrics"
            );
            let snapshot = Snapshot::new(device_id, metrics);
            if !queue.put(snapshot).await {
                error!(source = collector.source(), "failed to enqueue snapshot");
            }
        }
        Err(err) => {
            error!(%err, source = collector.source(), "collection attempt failed");
        }
    }
}

async fn interruptible_sleep(total: Duration, running: &AtomicBool) {
    let tick = Duration::from_secs(1);
    let mut remaining = total;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let step = remaining.min(tick);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_queue::UploadQueueConfig;

    struct CountingCollector {
        source: &'static str,
    }

    #[async_trait::async_trait]
    impl Collector for CountingCollector {
        async fn collect(&self) -> Result<Vec<telemetry_schema::MetricEntry>, crate::error::CollectorError> {
            Ok(vec![telemetry_schema::MetricEntry::new("ping", 1.0, "")
                .expect("valid metric")])
        }

        fn source(&self) -> &str {
            self.source
        }

        fn device_name(&self) -> &str {
            "test-device"
        }
    }

    #[tokio::test]
    async fn start_twice_is_a_noop() {
        let queue = Arc::new(UploadQueue::with_memory(UploadQueueConfig::default()));
        let mut runtime = CollectorRuntime::new(
            CountingCollector { source: "test" },
            DeviceId::new(),
            Duration::from_secs(60),
            queue,
        );
        runtime.start().unwrap();
        runtime.start().unwrap();
        assert_eq!(runtime.state(), RuntimeState::Running);
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_a_noop() {
        let queue = Arc::new(UploadQueue::with_memory(UploadQueueConfig::default()));
        let mut runtime = CollectorRuntime::new(
            CountingCollector { source: "test" },
            DeviceId::new(),
            Duration::from_secs(60),
            queue,
        );
        runtime.stop().await.unwrap();
        assert_eq!(runtime.state(), RuntimeState::New);
    }

    #[tokio::test]
    async fn start_after_stop_does_not_restart() {
        let queue = Arc::new(UploadQueue::with_memory(UploadQueueConfig::default()));
        let mut runtime = CollectorRuntime::new(
            CountingCollector { source: "test" },
            DeviceId::new(),
            Duration::from_millis(20),
            Arc::clone(&queue),
        );
        runtime.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        runtime.stop().await.unwrap();
        assert_eq!(runtime.state(), RuntimeState::Stopped);

        let stats_after_stop = queue.stats().await.unwrap();

        runtime.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            runtime.state(),
            RuntimeState::Stopped,
            "start() after a completed stop() must remain a no-op"
        );

        let stats_after_restart_attempt = queue.stats().await.unwrap();
        assert_eq!(stats_after_stop.pending, stats_after_restart_attempt.pending);
    }

    #[tokio::test]
    async fn one_tick_enqueues_a_snapshot() {
        let queue = Arc::new(UploadQueue::with_memory(UploadQueueConfig::default()));
        let mut runtime = CollectorRuntime::new(
            CountingCollector { source: "test" },
            DeviceId::new(),
            Duration::from_millis(20),
            Arc::clone(&queue),
        );
        runtime.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        runtime.stop().await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
    }
}
