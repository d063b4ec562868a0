//! Error types for collector sampling and the runtime state machine.

use thiserror::Error;

/// A single collection attempt failed.
///
/// Grounded on the Python collectors' behaviour: a sampling failure is
/// logged and the loop continues rather than tearing down the collector
/// (`base_data_collector.py::_collection_loop`'s try/except-and-continue).
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("{source_name}: sampling failed: {message}")]
    SamplingFailed { source_name: String, message: String },

    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors from [`crate::runtime::CollectorRuntime`] lifecycle transitions.
///
/// `start()`/`stop()` from an unexpected state are no-ops per spec, not
/// errors — this type is reserved for transitions that can still fail,
/// such as a panicked task join.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("collector task panicked during shutdown: {0}")]
    TaskPanicked(String),
}
