//! OS signal handling.
//!
//! On Unix: SIGINT, SIGTERM and SIGQUIT (plus `ctrl_c` as a fallback).
//! Elsewhere only `ctrl_c` is awaited.

use tokio_util::sync::CancellationToken;

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Spawn a watcher that cancels `token` on the first termination signal.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_shutdown_signal() => {
                if let Err(e) = res {
                    tracing::error!("failed to install signal handlers: {e}");
                    return;
                }
                tracing::info!("shutdown signal received");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}
