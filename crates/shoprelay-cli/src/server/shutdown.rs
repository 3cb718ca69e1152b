//! Shutdown signal handling for the HTTP server.

use std::time::Duration;

use super::TRACING_TARGET_SHUTDOWN;

/// Completes once SIGINT (Ctrl+C) or SIGTERM arrives.
///
/// Handed to axum's `with_graceful_shutdown`; once this resolves, in-flight
/// requests get up to `drain_timeout` to finish.
pub async fn shutdown_signal(drain_timeout: Duration) {
    tokio::select! {
        () = wait_for_interrupt() => {}
        () = wait_for_terminate() => {}
    }

    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        drain_timeout_secs = drain_timeout.as_secs(),
        "Draining in-flight requests before exit"
    );
}

async fn wait_for_interrupt() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "Received Ctrl+C, shutting down"
        ),
        Err(error) => tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "Failed to install Ctrl+C handler"
        ),
    }
}

#[cfg(unix)]
async fn wait_for_terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
            tracing::info!(
                target: TRACING_TARGET_SHUTDOWN,
                "Received SIGTERM, shutting down"
            );
        }
        Err(error) => tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "Failed to install SIGTERM handler"
        ),
    }
}

#[cfg(not(unix))]
async fn wait_for_terminate() {
    std::future::pending::<()>().await
}
