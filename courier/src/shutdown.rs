//! OS signal handling.
//!
//! SIGINT and SIGTERM are turned into a single cancellation of a
//! [`CancellationToken`] that the worker loop selects on.

use tokio::{signal, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Complete when SIGINT or (on unix) SIGTERM is received.
///
/// If a handler cannot be installed the corresponding branch never fires.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "sigint_handler_install_failed");
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
                error!(error = %e, "sigterm_handler_install_failed");
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

/// Spawn a task that cancels `token` on the first shutdown signal.
///
/// The task also ends, without cancelling, if the token is cancelled by
/// someone else first.
pub fn relay(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                info!("shutdown_requested");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}
