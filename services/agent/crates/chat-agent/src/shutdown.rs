use tokio::sync::watch;

/// Resolves once `true` has been published on `shutdown`.
///
/// A channel whose sender is gone can no longer carry a request, so a
/// closed channel never resolves.
pub async fn requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Waits for SIGTERM or SIGINT and flips `shutdown_tx` to `true`.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
#[cfg(unix)]
pub async fn signal_listener(shutdown_tx: watch::Sender<bool>) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
    }
    let _ = shutdown_tx.send(true);
    Ok(())
}

#[cfg(not(unix))]
pub async fn signal_listener(shutdown_tx: watch::Sender<bool>) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("received Ctrl-C, shutting down");
    let _ = shutdown_tx.send(true);
    Ok(())
}
