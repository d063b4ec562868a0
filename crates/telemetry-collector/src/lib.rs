//! # Telemetry Collector
//!
//! The collector runtime: the `Collector` trait, the `CollectorRuntime`
//! state machine driving it on a timer, concrete collectors, and the
//! per-collector config sections.
//!
//! ## Module organization
//!
//! - [collector] — the `Collector` trait
//! - [runtime] — `CollectorRuntime`, the NEW → RUNNING → STOPPING → STOPPED
//!   state machine wrapping a collector's sampling loop
//! - [collectors] — concrete collectors (`LocalCollector`, `WikipediaCollector`)
//! - [config] — per-collector config sections
//! - [error] — `CollectorError`, `RuntimeError`

pub mod collector;
pub mod collectors;
pub mod config;
pub mod error;
pub mod runtime;

pub use collector::Collector;
pub use collectors::{LocalCollector, WikipediaCollector};
pub use config::{CollectorConfig, LocalCollectorConfig, WikipediaCollectorConfig};
pub use error::{CollectorError, RuntimeError};
pub use runtime::{CollectorRuntime, RuntimeState};
