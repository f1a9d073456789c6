//! OS signal handling.

use crate::lifecycle::Shutdown;

/// Wait for Ctrl+C, then trigger shutdown.
///
/// If the handler cannot be installed the process keeps serving until it is
/// killed.
pub async fn shutdown_on_ctrl_c(shutdown: Shutdown) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}
