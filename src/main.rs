//! Heart Failure Ingestion Service - Main Entry Point
//!
//! Serves CSV ingestion, telemetry scoring and model inspection over HTTP.

use anyhow::{Context, Result};
use heart_failure_ingest::{
    app,
    config::{AppConfig, LoggingConfig},
    http,
    metrics::MetricsReporter,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Heart Failure Ingestion Service");
    info!(
        storage = ?config.storage.backend,
        bucket = %config.storage.bucket,
        database = ?config.database.backend,
        table = %config.database.table,
        voting = %config.model.voting,
        scaling = %config.model.scaling,
        "Configuration loaded"
    );

    let state = app::build_state(&config).await?;
    let metrics = state.metrics.clone();

    if config.server.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.server.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    info!(addr = %config.server.addr, "Listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Print final summary
    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "heart_failure_ingest={level},tower_http={level}",
            level = logging.level
        ))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
