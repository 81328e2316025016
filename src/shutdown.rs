//! OS signal handling for the relay binary.
//!
//! **Unix platforms:** `SIGINT`, `SIGTERM` and `SIGQUIT` all request shutdown.
//!
//! **Windows platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`].

/// Completes when the process receives a termination signal.
///
/// Returns `Err` if a signal listener could not be registered.
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
