//! The upload worker loop.
//!
//! Grounded on `redis_queue.py`'s `_worker_loop`/`_process_retry_queue`/
//! `_process_pending_queue`/`_attempt_upload`: drain due retries first, then
//! pop and attempt one pending envelope per iteration, sleeping only when
//! neither step did anything. The Python implementation ran this on a daemon
//! thread; here it is a `tokio::task` cooperating with a `CancellationToken`-
//! style shutdown signal, matching how the teacher's provider background
//! tasks are driven from `start`/`stop`.

use crate::backoff::retry_delay_secs;
use crate::broker::Broker;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::UploadQueueConfig;
use crate::envelope::Envelope;
use crate::outcome::UploadOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry_schema::UnixTimestamp;
use tracing::{debug, error, info, instrument, warn};

const RETRY_BATCH_LIMIT: usize = 10;
const PENDING_POP_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs one iteration of the worker loop, returning whether any work was
/// done (mirrors the Python `processed` flag that decides whether to sleep).
pub async fn run_once(
    broker: &dyn Broker,
    http: &reqwest::Client,
    breaker: &CircuitBreaker,
    config: &UploadQueueConfig,
) -> bool {
    let retried = process_due_retries(broker).await;
    let processed = process_one_pending(broker, http, breaker, config).await;
    retried || processed
}

#[instrument(skip(broker))]
async fn process_due_retries(broker: &dyn Broker) -> bool {
    let due = match broker.due_retries(UnixTimestamp::now(), RETRY_BATCH_LIMIT).await {
        Ok(due) => due,
        Err(err) => {
            error!(%err, "failed to query due retries");
            return false;
        }
    };
    if due.is_empty() {
        return false;
    }
    for envelope in due {
        if let Err(err) = broker.remove_retry(&envelope).await {
            error!(%err, snapshot_id = %envelope.snapshot_id(), "failed to remove envelope from retry set");
            continue;
        }
        if let Err(err) = broker.push_pending(envelope.clone()).await {
            error!(%err, snapshot_id = %envelope.snapshot_id(), "failed to move envelope back to pending");
            continue;
        }
        debug!(
            snapshot_id = %envelope.snapshot_id(),
            retry_count = envelope.retry_count,
            "moved envelope from retry to pending"
        );
    }
    true
}

#[instrument(skip(broker, http, breaker, config))]
async fn process_one_pending(
    broker: &dyn Broker,
    http: &reqwest::Client,
    breaker: &CircuitBreaker,
    config: &UploadQueueConfig,
) -> bool {
    let envelope = match broker.pop_pending(PENDING_POP_TIMEOUT).await {
        Ok(Some(envelope)) => envelope,
        Ok(None) => return false,
        Err(err) => {
            error!(%err, "failed to pop pending envelope");
            return false;
        }
    };

    let attempt_number = envelope.retry_count + 1;
    debug!(
        snapshot_id = %envelope.snapshot_id(),
        attempt_number,
        max_retry_attempts = config.max_retry_attempts,
        "attempting upload"
    );

    let outcome = attempt_upload(http, breaker, config, &envelope).await;
    route_outcome(broker, config, envelope, outcome).await;
    true
}

async fn attempt_upload(
    http: &reqwest::Client,
    breaker: &CircuitBreaker,
    config: &UploadQueueConfig,
    envelope: &Envelope,
) -> UploadOutcome {
    if config.api_endpoint.is_empty() {
        return UploadOutcome::transient("no api_endpoint configured");
    }
    if !breaker.allow_request() {
        return UploadOutcome::transient("circuit breaker open");
    }

    let mut request = http
        .post(&config.api_endpoint)
        .json(&envelope.payload)
        .timeout(config.timeout);
    if let Some(api_key) = &config.api_key {
        request = request.header("X-API-Key", api_key);
    }

    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let body_excerpt = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect::<String>();
            let outcome = UploadOutcome::from_status(status, &body_excerpt);
            match &outcome {
                UploadOutcome::Success => breaker.record_success(),
                UploadOutcome::Transient(_) => breaker.record_failure(),
                UploadOutcome::Permanent(_) => {}
            }
            outcome
        }
        Err(err) if err.is_timeout() => {
            breaker.record_failure();
            UploadOutcome::transient("request timed out")
        }
        Err(err) => {
            breaker.record_failure();
            UploadOutcome::transient(format!("connection error: {err}"))
        }
    }
}

async fn route_outcome(
    broker: &dyn Broker,
    config: &UploadQueueConfig,
    mut envelope: Envelope,
    outcome: UploadOutcome,
) {
    let snapshot_id = envelope.snapshot_id();
    match outcome {
        UploadOutcome::Success => {
            info!(%snapshot_id, "upload succeeded");
        }
        UploadOutcome::Permanent(err) => {
            envelope.last_error = Some(err.to_string());
            error!(%snapshot_id, error = %err, "upload rejected permanently, moving to failed");
            if let Err(err) = broker.push_failed(envelope).await {
                error!(%err, %snapshot_id, "failed to record permanently-failed envelope");
            }
        }
        UploadOutcome::Transient(err) => {
            envelope.retry_count += 1;
            envelope.last_error = Some(err.to_string());
            if envelope.retry_count >= config.max_retry_attempts {
                error!(
                    %snapshot_id,
                    retry_count = envelope.retry_count,
                    error = %err,
                    "retries exhausted, moving to failed"
                );
                if let Err(err) = broker.push_failed(envelope).await {
                    error!(%err, %snapshot_id, "failed to record exhausted envelope");
                }
            } else {
                let delay = retry_delay_secs(
                    config.backoff_base,
                    config.backoff_multiplier,
                    envelope.retry_count,
                );
                let retry_at = UnixTimestamp::now() + delay as f64;
                warn!(
                    %snapshot_id,
                    retry_count = envelope.retry_count,
                    max_retry_attempts = config.max_retry_attempts,
                    delay_secs = delay,
                    error = %err,
                    "scheduling retry"
                );
                if let Err(err) = broker.schedule_retry(envelope, retry_at).await {
                    error!(%err, %snapshot_id, "failed to schedule retry");
                }
            }
        }
    }
}

/// Cooperative stop flag shared between `UploadQueue::stop` and the spawned
/// worker task, mirroring the Python implementation's `self.running` flag.
#[derive(Default)]
pub struct ShutdownFlag(AtomicBool);

impl ShutdownFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(false)))
    }

    pub fn signal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use crate::providers::MemoryBroker;
    use telemetry_schema::{DeviceId, MetricEntry, Snapshot};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_envelope() -> Envelope {
        let metric = MetricEntry::new("cpu_percent", 12.5, "percent").unwrap();
        Envelope::new(Snapshot::new(DeviceId::new(), vec![metric]))
    }

    fn test_config(endpoint: String) -> UploadQueueConfig {
        UploadQueueConfig {
            api_endpoint: endpoint,
            max_retry_attempts: 3,
            backoff_base: 1,
            backoff_multiplier: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn successful_upload_leaves_all_queues_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/metrics"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let broker = MemoryBroker::new();
        broker.push_pending(sample_envelope()).await.unwrap();
        let http = reqwest::Client::new();
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let config = test_config(format!("{}/api/metrics", server.uri()));

        let processed = run_once(&broker, &http, &breaker, &config).await;
        assert!(processed);

        let stats = broker.stats().await.unwrap();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.retry, 0);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn server_error_schedules_a_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/metrics"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let broker = MemoryBroker::new();
        broker.push_pending(sample_envelope()).await.unwrap();
        let http = reqwest::Client::new();
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let config = test_config(format!("{}/api/metrics", server.uri()));

        run_once(&broker, &http, &breaker, &config).await;

        let stats = broker.stats().await.unwrap();
        assert_eq!(stats.retry, 1);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn permanent_error_moves_straight_to_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/metrics"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let broker = MemoryBroker::new();
        broker.push_pending(sample_envelope()).await.unwrap();
        let http = reqwest::Client::new();
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let config = test_config(format!("{}/api/metrics", server.uri()));

        run_once(&broker, &http, &breaker, &config).await;

        let stats = broker.stats().await.unwrap();
        assert_eq!(stats.retry, 0);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn retries_exhausted_moves_to_failed_instead_of_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/metrics"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let broker = MemoryBroker::new();
        let mut envelope = sample_envelope();
        envelope.retry_count = 2; // max_retry_attempts is 3, so this is the last attempt
        broker.push_pending(envelope).await.unwrap();
        let http = reqwest::Client::new();
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let config = test_config(format!("{}/api/metrics", server.uri()));

        run_once(&broker, &http, &breaker, &config).await;

        let stats = broker.stats().await.unwrap();
        assert_eq!(stats.retry, 0);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn empty_queue_reports_no_work_done() {
        let broker = MemoryBroker::new();
        let http = reqwest::Client::new();
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let config = test_config("http://127.0.0.1:9/api/metrics".to_string());

        let processed = run_once(&broker, &http, &breaker, &config).await;
        assert!(!processed);
    }
}
