//! Error types for the broker and upload queue.

/// Errors raised by a [`crate::Broker`] implementation.
///
/// A broker error in the worker loop never propagates to collectors — the
/// worker logs it and retries the outer loop (spec: "Broker unreachable
/// in worker").
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker connection unavailable: {0}")]
    Unavailable(String),

    #[error("failed to (de)serialize envelope: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("broker backend error: {0}")]
    Backend(String),
}

/// Errors raised by [`crate::UploadQueue::start`] / `stop`.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("failed to connect to broker: {0}")]
    BrokerUnavailable(#[from] BrokerError),

    #[error("queue worker is already running")]
    AlreadyRunning,

    #[error("queue worker did not stop within the grace period")]
    ShutdownTimedOut,
}
