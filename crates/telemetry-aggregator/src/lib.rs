//! # Telemetry Aggregator
//!
//! The orchestrator binary: a single process with no required arguments
//! that reads a config file, registers itself and its collectors with the
//! ingestion server, then runs the configured collectors and upload queue
//! until a shutdown signal arrives.

pub mod config;
pub mod registration;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use telemetry_collector::{CollectorRuntime, LocalCollector, WikipediaCollector};
use telemetry_queue::UploadQueue;
use tracing::{error, info, warn};

pub use config::{Config, LoggingSection};
pub use registration::{RegistrationClient, RegistrationError};

/// Orchestrator CLI — single binary, no required arguments, reads a config
/// file.
#[derive(Parser)]
#[command(name = "telemetry-aggregator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Samples local telemetry and uploads it to the ingestion server")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TELEMETRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level override
    #[arg(short, long)]
    pub log_level: Option<String>,
}

/// Startup-failure causes. Spec exit codes: 0 normal, 1 startup failure
/// (broker unreachable, server never healthy, zero collectors enabled).
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("no collectors are enabled in configuration")]
    NoCollectorsEnabled,

    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),

    #[error("upload queue failed to start: {0}")]
    Queue(#[from] telemetry_queue::QueueError),
}

pub fn load_config(path: Option<&PathBuf>) -> Result<Config, config::ConfigError> {
    let mut builder = ::config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(::config::File::from(path.as_path()));
    } else {
        builder = builder.add_source(::config::File::with_name("config").required(false));
    }
    builder = builder.add_source(::config::Environment::with_prefix("APP").separator("__"));

    let raw = builder.build()?;
    let config: Config = raw.try_deserialize()?;
    Ok(config)
}

/// Runs the orchestrator to completion: register, start collectors and the
/// upload queue, then block until `shutdown` resolves.
pub async fn run(
    config: Config,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<(), AggregatorError> {
    if !config.local_collector.enabled && !config.wikipedia_collector.enabled {
        return Err(AggregatorError::NoCollectorsEnabled);
    }

    let registration = RegistrationClient::new(config.upload_queue.registration_base_url.clone());
    registration.wait_healthy(Duration::from_secs(30)).await?;

    let aggregator_id = registration
        .register_aggregator(&config.aggregator.name)
        .await?;
    info!(aggregator_id = %aggregator_id, name = %config.aggregator.name, "aggregator registered");

    let mut queue = UploadQueue::with_redis(config.upload_queue.queue_config()).await?;
    queue.start()?;
    let queue = Arc::new(queue);

    let mut runtimes: Vec<RunningCollector> = Vec::new();

    if config.local_collector.enabled {
        let device_id = registration
            .register_device(aggregator_id, "local", &"local".to_string())
            .await?;
        let collector = LocalCollector::new(
            "local",
            &config.local_collector.collector_config(),
            config.collectors.metric_precision,
        );
        let interval = Duration::from_secs(config.local_collector.collection_interval);
        let mut runtime = CollectorRuntime::new(collector, device_id, interval, Arc::clone(&queue));
        runtime.start().expect("runtime freshly created, cannot already be running");
        runtimes.push(RunningCollector::Local(runtime));
    }

    if config.wikipedia_collector.enabled {
        let device_id = registration
            .register_device(aggregator_id, "wikipedia", &"wikipedia".to_string())
            .await?;
        let collector =
            WikipediaCollector::new("wikipedia", &config.wikipedia_collector.collector_config());
        let interval = Duration::from_secs(config.wikipedia_collector.collection_interval);
        let mut runtime = CollectorRuntime::new(collector, device_id, interval, Arc::clone(&queue));
        runtime.start().expect("runtime freshly created, cannot already be running");
        runtimes.push(RunningCollector::Wikipedia(runtime));
    }

    info!(collectors = runtimes.len(), "aggregator running");
    shutdown.await;
    info!("shutdown signal received, stopping collectors and upload queue");

    for runtime in &mut runtimes {
        if let Err(err) = runtime.stop().await {
            warn!(%err, "collector did not stop cleanly");
        }
    }

    // Arc::try_unwrap requires it to be the sole owner; the collectors above
    // have already been stopped and dropped their clones.
    match Arc::try_unwrap(queue) {
        Ok(mut queue) => {
            if let Err(err) = queue.stop().await {
                error!(%err, "upload queue did not stop cleanly");
            }
        }
        Err(_) => warn!("upload queue still has outstanding references at shutdown"),
    }

    Ok(())
}

enum RunningCollector {
    Local(CollectorRuntime<LocalCollector>),
    Wikipedia(CollectorRuntime<WikipediaCollector>),
}

impl RunningCollector {
    async fn stop(&mut self) -> Result<(), telemetry_collector::RuntimeError> {
        match self {
            Self::Local(runtime) => runtime.stop().await,
            Self::Wikipedia(runtime) => runtime.stop().await,
        }
    }
}
