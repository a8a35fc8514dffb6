// Connection handling module
// Accepts a single TCP connection and serves it over HTTP/1.1

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept and process a connection, checking limits and logging.
///
/// Returns `false` when the connection was rejected by `max_connections`.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `stop` - Flips to `true` when the server is shutting down
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    stop: watch::Receiver<bool>,
) -> bool {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return false;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(stream, peer_addr, Arc::clone(state), stop);
    true
}

/// Serve a single connection in a spawned task.
///
/// The task owns one slot of `active_connections` and releases it
/// when the connection ends, whether cleanly, with an error or by timeout.
/// Once `stop` flips, hyper finishes the request in flight (if any)
/// and closes the connection instead of waiting for the next one.
#[allow(clippy::ignored_unit_patterns)]
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    mut stop: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let keep_alive = state.config.performance.keep_alive_enabled();
        let timeout_duration = state.config.performance.connection_timeout();

        let mut builder = http1::Builder::new();
        builder.keep_alive(keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );
        tokio::pin!(conn);

        let served = tokio::time::timeout(timeout_duration, async {
            tokio::select! {
                res = conn.as_mut() => res,
                _ = stop_requested(&mut stop) => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            }
        });

        match served.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Resolves once the stop flag is set (or its sender is gone)
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn capped_state(max_connections: u64) -> Arc<AppState> {
        let mut config = Config::default();
        config.logging.access_log = false;
        config.performance.max_connections = Some(max_connections);
        Arc::new(AppState::new(config).unwrap())
    }

    /// Returns (client side, server side, peer address of the client)
    async fn tcp_pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (client, server, peer)
    }

    #[tokio::test]
    async fn test_rejects_over_max_connections() {
        let state = capped_state(1);
        // One slot already taken
        state.active_connections.store(1, Ordering::SeqCst);
        let (_stop_tx, stop_rx) = watch::channel(false);

        let (mut client, server, peer) = tcp_pair().await;
        assert!(!accept_connection(server, peer, &state, stop_rx));
        assert_eq!(state.active_connections(), 1);

        // Rejected connection is closed without a response
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty(), "rejected connection got {} bytes", buf.len());
    }

    #[tokio::test]
    async fn test_accepts_under_max_connections() {
        let state = capped_state(2);
        state.active_connections.store(1, Ordering::SeqCst);
        let (_stop_tx, stop_rx) = watch::channel(false);

        let (mut client, server, peer) = tcp_pair().await;
        assert!(accept_connection(server, peer, &state, stop_rx));
        assert_eq!(state.active_connections(), 2);

        client
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf).starts_with("HTTP/1.1 301"));
    }

    #[tokio::test]
    async fn test_keep_alive_disabled_closes_after_response() {
        let mut config = Config::default();
        config.logging.access_log = false;
        config.performance.keep_alive_timeout = 0;
        let state = Arc::new(AppState::new(config).unwrap());
        let (_stop_tx, stop_rx) = watch::channel(false);

        let (mut client, server, peer) = tcp_pair().await;
        assert!(accept_connection(server, peer, &state, stop_rx));

        // No `Connection: close`; the server must still end the connection
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut buf = Vec::new();
        tokio::time::timeout(std::time::Duration::from_secs(5), client.read_to_end(&mut buf))
            .await
            .expect("connection stayed open with keep-alive disabled")
            .unwrap();
        assert!(String::from_utf8_lossy(&buf).starts_with("HTTP/1.1 301"));
    }

    /// Read one complete redirect response off a keep-alive connection
    async fn read_redirect(client: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-response");
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some((_, body)) = text.split_once("\r\n\r\n") {
                if body.starts_with("Moved Permanently") && body.ends_with('\n') {
                    return text;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_stop_closes_idle_keep_alive_connection() {
        let state = capped_state(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let (mut client, server, peer) = tcp_pair().await;
        assert!(accept_connection(server, peer, &state, stop_rx));

        client
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        assert!(read_redirect(&mut client).await.starts_with("HTTP/1.1 301"));

        // Connection now sits idle in keep-alive
        stop_tx.send_replace(true);

        let mut rest = Vec::new();
        tokio::time::timeout(std::time::Duration::from_secs(5), client.read_to_end(&mut rest))
            .await
            .expect("idle keep-alive connection not closed after stop")
            .unwrap();
        assert!(rest.is_empty());

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while state.active_connections() != 0 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("connection slot not released");
    }
}
