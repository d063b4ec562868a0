//! # Telemetry Server
//!
//! Binary entry point for the ingestion HTTP service.
//!
//! This executable:
//! - Loads configuration from `config.toml` layered with `APP__*` env vars
//! - Initializes structured logging
//! - Builds the Postgres pool and runs pending migrations
//! - Starts the `telemetry-ingest` router with graceful shutdown

use telemetry_ingest::{start_server_with_pool, IngestConfig, LoggingConfig, ServiceError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn load_config() -> Result<IngestConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()
}

/// Build the global subscriber from `[logging]`, keeping the guard alive
/// for the process lifetime so a non-blocking file appender keeps flushing.
fn init_logging(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("telemetry_server={level},telemetry_ingest={level}", level = logging.level).into()
    });

    match &logging.file {
        Some(path) => {
            let directory = std::path::Path::new(path).parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = std::path::Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "server.log".to_string());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            if logging.json_format {
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
            if logging.json_format {
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
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(3);
        }
    };

    let _logging_guard = init_logging(&config.logging);

    info!("starting telemetry-server");

    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        std::process::exit(3);
    }

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "failed to connect to database");
            std::process::exit(1);
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        error!(error = %e, "failed to run migrations");
        std::process::exit(1);
    }
    info!("migrations up to date");

    if let Err(e) = start_server_with_pool(config, pool).await {
        error!(error = %e, "server failed");

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
            ServiceError::Database(_) => 4,
            ServiceError::Migration(_) => 5,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}
