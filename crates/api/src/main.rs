//! countfeed server binary.

use anyhow::Context;
use clap::Parser;
use countfeed_api::{CliArgs, Service};
use countfeed_engine::{CountfeedConfig, LoggingHandler};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let config = CountfeedConfig::load_or_create(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let service = Service::new(config, args.owner_id()).context("failed to start service")?;

    let seeded = service.seed().await;
    info!(seeded, "Counter seeding finished");

    let cancel = CancellationToken::new();
    let processor = service
        .start_feed(Arc::new(LoggingHandler), cancel.clone())
        .context("failed to start change feed processor")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, owner = %service.owner(), "Starting countfeed server");

    let served = axum::serve(listener, service.router())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Stopping change feed processor");
    processor.shutdown().await;
    served.context("HTTP server failed")?;

    info!("Server shut down gracefully");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Listen for SIGTERM and SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
