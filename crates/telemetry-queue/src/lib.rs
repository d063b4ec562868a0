//! # Telemetry Upload Queue
//!
//! A durable, at-least-once upload queue sitting between an aggregator's
//! collectors and the central ingestion server: a PENDING FIFO, a RETRY set
//! scored by eligible-at time, and a FAILED dead-letter list, drained by a
//! single background worker per process.
//!
//! Two [`Broker`] implementations are provided: [`MemoryBroker`] for tests
//! and single-process runs, and [`RedisBroker`] for production, matching the
//! original system's Redis-backed queue key-for-key.
//!
//! ## Module organization
//!
//! - [broker] — the `Broker` trait all storage backends implement
//! - [providers] — `MemoryBroker` and `RedisBroker`
//! - [envelope] — the retry-tracking wrapper around a snapshot
//! - [outcome] — typed classification of an upload attempt
//! - [backoff] — exponential backoff delay computation
//! - [circuit_breaker] — guards the worker's HTTP sink against a down server
//! - [worker] — the loop that drains RETRY then PENDING
//! - [queue] — [`UploadQueue`], the public entry point
//! - [config] — [`UploadQueueConfig`]
//! - [error] — error types for all queue operations

pub mod backoff;
pub mod broker;
pub mod circuit_breaker;
pub mod config;
pub mod envelope;
pub mod error;
pub mod outcome;
pub mod providers;
pub mod queue;
pub mod worker;

pub use broker::Broker;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::UploadQueueConfig;
pub use envelope::{BrokerStats, Envelope};
pub use error::{BrokerError, QueueError};
pub use outcome::{PermanentError, TransientError, UploadOutcome};
pub use providers::{MemoryBroker, RedisBroker};
pub use queue::UploadQueue;
