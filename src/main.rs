use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::Notify;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;

use error::StartupError;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), StartupError> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());

    let cfg = config::Config::load_from(&config_path)?;
    // Validate everything before touching the network
    let state = Arc::new(config::AppState::new(cfg)?);
    let addr = state.config.get_socket_addr()?;

    logger::init(&state.config).map_err(StartupError::Logger)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = state.config.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build().map_err(StartupError::Runtime)?;

    runtime.block_on(async_main(addr, state))
}

async fn async_main(addr: std::net::SocketAddr, state: Arc<config::AppState>) -> Result<(), StartupError> {
    let listener = server::create_reusable_listener(addr)
        .map_err(|source| StartupError::Bind { addr, source })?;

    let shutdown = Arc::new(Notify::new());
    if let Err(e) = server::start_signal_handler(Arc::clone(&shutdown)) {
        logger::log_warning(&format!("Signal handlers unavailable, graceful shutdown disabled: {e}"));
    }

    logger::log_server_start(&addr, &state.target, &state.config);

    server::start_server_loop(listener, state, shutdown).await;
    Ok(())
}
