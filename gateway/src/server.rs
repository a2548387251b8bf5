//! Listener startup and shutdown handling for the binary.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use smtp2http::{Config, DispatchHandle, Listener};

/// Bind the SMTP listener, signal readiness, and serve until SIGINT/SIGTERM.
///
/// Any error here happens before the first connection is accepted.
pub async fn run(config: &Config, addr: SocketAddr, handle: DispatchHandle) -> Result<()> {
    let hostname = config.greeting_hostname();

    let listener = Listener::bind(addr, &hostname, handle)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let local_addr = listener.local_addr().context("Failed to read bound address")?;
    info!(address = %local_addr, "smtp_listener_bound");

    if let Some(fd) = config.notify_fd {
        notify_ready(fd)?;
    }

    tokio::select! {
        _ = listener.serve() => {}
        _ = shutdown_signal() => info!("gateway_stopping"),
    }

    Ok(())
}

#[cfg(unix)]
fn notify_ready(fd: i32) -> Result<()> {
    smtp2http::notify::signal_ready(fd)
        .with_context(|| format!("Failed to write readiness notification to descriptor {fd}"))
}

#[cfg(not(unix))]
fn notify_ready(fd: i32) -> Result<()> {
    anyhow::bail!("readiness descriptors are not supported on this platform (got {fd})")
}

/// Completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl_c_handler_failed");
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
                tracing::error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
