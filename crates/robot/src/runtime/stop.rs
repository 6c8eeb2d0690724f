//! Stop — wait for an operator request to shut the robot down.

use std::io::BufRead;

use tokio::sync::oneshot;
use tracing::warn;

/// Resolve on Ctrl+C, SIGTERM, or a line on stdin.
pub async fn shutdown_requested() {
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
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        },
        _ = enter_pressed() => {
            warn!("Received stop request on stdin, initiating graceful shutdown...");
        },
    }
}

/// Resolves when a line is read from stdin. Never resolves once stdin is closed.
///
/// Reads on a detached thread: a blocking stdin read would otherwise hold
/// the runtime open at exit.
async fn enter_pressed() {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = std::io::stdin().lock().read_line(&mut line) {
            if n > 0 {
                let _ = tx.send(());
            }
        }
    });

    if rx.await.is_err() {
        std::future::pending::<()>().await;
    }
}
