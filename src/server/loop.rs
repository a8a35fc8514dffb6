// Server loop module
// Accepts connections until shutdown, then drains the ones still in flight

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// How often the drain checks whether in-flight connections are done
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept connections on `listener` until `shutdown` is notified.
///
/// Accept errors are logged and the loop keeps going. After shutdown the
/// listener is closed first, every open connection is told to finish its
/// current request and close, then they get up to the connection timeout
/// to do so.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let (stop_tx, stop_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, stop_rx.clone());
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);
    stop_tx.send_replace(true);

    logger::log_shutdown_started(state.active_connections());
    let deadline = tokio::time::Instant::now() + state.config.performance.connection_timeout();
    let remaining = drain_connections(&state, deadline).await;
    logger::log_shutdown_complete(remaining);
}

/// Wait until no connection is active or `deadline` passes.
///
/// Returns the number of connections still open when it gave up.
async fn drain_connections(state: &AppState, deadline: tokio::time::Instant) -> usize {
    loop {
        let active = state.active_connections();
        if active == 0 || tokio::time::Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
