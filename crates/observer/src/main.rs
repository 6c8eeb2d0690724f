mod config;
mod monitor;
mod summary;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use robot::transport::UdpMulticast;

use crate::{
    config::{LogFormat, LogOutput, ObserverConfig},
    monitor::Monitor,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Phase 1: thread-local subscriber so config loading can log
    let basic_tracing = init_tracing_basic();

    info!("Starting Flockcast observer v{}", env!("CARGO_PKG_VERSION"));

    let config = ObserverConfig::load().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    // Phase 2: global subscriber from config
    drop(basic_tracing);
    init_tracing_from_config(&config)?;

    info!("Configuration loaded successfully");

    let transport = UdpMulticast::join(&config.network).context("Failed to join swarm group")?;
    info!("Listening on {}", transport.destination());

    let monitor = Monitor::new(
        Arc::new(transport),
        config.monitor.peer_timeout(),
        config.network.poll_timeout(),
        config.monitor.report_interval(),
    );

    let cancel = CancellationToken::new();
    let task = tokio::spawn(monitor.run(cancel.clone()));

    shutdown_signal().await;
    cancel.cancel();

    let stats = task.await.context("Monitor task failed")?;
    info!(
        "Observer shut down gracefully (joins={}, departures={}, expired={})",
        stats.joins, stats.departures, stats.expired
    );
    Ok(())
}

/// Phase 1: pretty output at info until the configured subscriber takes over.
fn init_tracing_basic() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));
    tracing::subscriber::set_default(subscriber)
}

/// Phase 2: `RUST_LOG` wins over the configured level.
fn init_tracing_from_config(config: &ObserverConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let open = |path: &str| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file '{}'", path))
    };

    match (&config.logging.format, &config.logging.output) {
        (LogFormat::Json, LogOutput::Stdout) => {
            let layer = fmt::layer().json().with_target(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Json, LogOutput::File { path }) => {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Arc::new(open(path)?));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Pretty, LogOutput::Stdout) => {
            let layer = fmt::layer().with_target(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Pretty, LogOutput::File { path }) => {
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Arc::new(open(path)?));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            warn!("Received SIGTERM, shutting down...");
        },
    }
}
