//! Redis-backed broker: the production implementation.
//!
//! Grounded directly on `redis_queue.py`'s key layout — `metrics:pending`
//! (list, LPUSH/BRPOP for FIFO order), `metrics:retry` (sorted set scored by
//! the Unix timestamp the envelope becomes eligible again), `metrics:failed`
//! (list, append-only dead letters). Uses the `redis` crate's async
//! connection manager the way `telemetry-collector` reaches for pooled
//! clients elsewhere in the workspace.

use crate::broker::Broker;
use crate::envelope::{BrokerStats, Envelope};
use crate::error::BrokerError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use telemetry_schema::UnixTimestamp;

const PENDING_KEY: &str = "metrics:pending";
const RETRY_KEY: &str = "metrics:retry";
const FAILED_KEY: &str = "metrics:failed";

pub struct RedisBroker {
    conn: ConnectionManager,
}

impl RedisBroker {
    /// Connect to Redis at `redis://[:password@]host:port/db`.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let client = redis::Client::open(url)
            .map_err(|e| BrokerError::Backend(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn push_pending(&self, envelope: Envelope) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(&envelope)?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(PENDING_KEY, payload)
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn pop_pending(&self, wait: Duration) -> Result<Option<Envelope>, BrokerError> {
        let mut conn = self.conn.clone();
        let result: Option<(String, String)> = conn
            .brpop(PENDING_KEY, wait.as_secs_f64())
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        match result {
            Some((_, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn due_retries(
        &self,
        now: UnixTimestamp,
        limit: usize,
    ) -> Result<Vec<Envelope>, BrokerError> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .zrangebyscore_limit(RETRY_KEY, f64::MIN, now.as_secs(), 0, limit as isize)
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        raw.iter()
            .map(|payload| serde_json::from_str(payload).map_err(BrokerError::from))
            .collect()
    }

    async fn remove_retry(&self, envelope: &Envelope) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(envelope)?;
        let mut conn = self.conn.clone();
        conn.zrem::<_, _, ()>(RETRY_KEY, payload)
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn schedule_retry(&self, envelope: Envelope, at: UnixTimestamp) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(&envelope)?;
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(RETRY_KEY, payload, at.as_secs())
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn push_failed(&self, envelope: Envelope) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(&envelope)?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(FAILED_KEY, payload)
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn stats(&self) -> Result<BrokerStats, BrokerError> {
        let mut conn = self.conn.clone();
        let pending: u64 = conn
            .llen(PENDING_KEY)
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        let retry: u64 = conn
            .zcard(RETRY_KEY)
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        let failed: u64 = conn
            .llen(FAILED_KEY)
            .await
            .map_err(|e| BrokerError::Backend(e.to_string()))?;
        Ok(BrokerStats {
            pending,
            retry,
            failed,
        })
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
