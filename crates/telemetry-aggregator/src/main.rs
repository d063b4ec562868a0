//! Binary entry point for the orchestrator process.

use clap::Parser;
use telemetry_aggregator::{load_config, run, AggregatorError, Cli, LoggingSection};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build the global subscriber from `[logging]`, keeping the guard alive
/// for the process lifetime so a non-blocking file appender keeps flushing.
fn init_logging(logging: &LoggingSection, cli_level: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let level = cli_level.unwrap_or(&logging.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("telemetry_aggregator={level}").into());

    let json = logging.format.eq_ignore_ascii_case("json");

    match &logging.file {
        Some(path) => {
            let directory = std::path::Path::new(path).parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = std::path::Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "aggregator.log".to_string());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            if json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
                    .init();
            }
            Some(guard)
        }
        None => {
            if json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().json())
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
            }
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let _logging_guard = init_logging(&config.logging, cli.log_level.as_deref());

    let shutdown = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    if let Err(e) = run(config, shutdown).await {
        error!(error = %e, "aggregator failed to start");

        let exit_code = match e {
            AggregatorError::Configuration(_) => 1,
            AggregatorError::NoCollectorsEnabled => 1,
            AggregatorError::Registration(_) => 1,
            AggregatorError::Queue(_) => 1,
        };
        std::process::exit(exit_code);
    }
}
