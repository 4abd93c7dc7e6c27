//! Signal handling for graceful shutdown.

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Set up signal handlers for graceful shutdown.
///
/// Returns a receiver that gets one message per SIGTERM or SIGINT.
pub fn setup_signal_handlers() -> mpsc::Receiver<&'static str> {
    let (tx, rx) = mpsc::channel(2);

    let tx_term = tx.clone();
    tokio::spawn(async move {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM");
                let _ = tx_term.send("SIGTERM").await;
            }
            Err(e) => warn!(error = %e, "SIGTERM handler unavailable"),
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            let _ = tx.send("SIGINT").await;
        }
    });

    rx
}
