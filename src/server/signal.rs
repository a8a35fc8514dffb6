// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)
// - SIGHUP:  Logged and ignored; the redirect target is fixed for the process lifetime

use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Start signal handlers (Unix only)
///
/// Spawns a background task that notifies `shutdown` once on the
/// first SIGTERM or SIGINT. `notify_one` stores a permit, so a signal
/// that arrives before the server loop polls is not lost.
///
/// | Signal  | Action           |
/// |---------|------------------|
/// | SIGTERM | Graceful stop    |
/// | SIGINT  | Graceful stop    |
/// | SIGHUP  | Ignored (logged) |
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    logger::log_debug(&format!(
        "[SIGNAL] Handlers registered (SIGTERM, SIGINT, SIGHUP), pid {}",
        std::process::id()
    ));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    logger::log_info("[SIGNAL] SIGTERM received, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    logger::log_info("[SIGNAL] SIGINT received, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    logger::log_info("[SIGNAL] SIGHUP received; configuration is fixed at startup, restart the process to change it");
                }
            }
        }
        shutdown.notify_one();
    });

    Ok(())
}

/// Non-Unix fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => logger::log_info("[SIGNAL] Ctrl+C received, shutting down gracefully"),
            Err(e) => {
                logger::log_error(&format!("[SIGNAL] Failed to listen for Ctrl+C: {e}"));
                return;
            }
        }
        shutdown.notify_one();
    });

    Ok(())
}
