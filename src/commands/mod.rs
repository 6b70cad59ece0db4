pub mod check;
pub mod clean;
pub mod download;
pub mod run;
pub mod upload;

use tokio::signal;
use tracing::warn;

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
pub async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
