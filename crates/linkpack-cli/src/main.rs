mod api;
mod cli;
mod logging;
mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use linkpack_core::OrchestratorBuilder;

use crate::cli::Args;

/// How long running jobs get to finish after the server stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// How long open connections get to finish their current request.
const CONNECTION_DRAIN: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level)?;

    let orchestrator = OrchestratorBuilder::new(args.bundle_config())
        .build()
        .context("failed to start task orchestrator")?;
    let orchestrator = Arc::new(orchestrator);

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "http server listening");

    server::serve(
        listener,
        api::router(Arc::clone(&orchestrator), args.request_timeout()),
        args.idle_timeout,
        CONNECTION_DRAIN,
        shutdown_signal(),
    )
    .await;

    tracing::info!("http server stopped, draining processing jobs");
    if orchestrator.shutdown(SHUTDOWN_GRACE).await {
        tracing::info!("all processing jobs finished");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
