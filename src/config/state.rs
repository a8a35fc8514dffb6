// Application state module
// Immutable configuration plus the few counters shared across connections

use std::sync::atomic::{AtomicUsize, Ordering};

use super::target::RedirectTarget;
use super::types::Config;
use crate::error::StartupError;

/// Application state
///
/// Built once before the listener starts and shared read-only
/// by every connection task through an `Arc`.
pub struct AppState {
    pub config: Config,
    pub target: RedirectTarget,

    /// Connections currently being served
    pub active_connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, StartupError> {
        let target = config.redirect_target()?;

        Ok(Self {
            config,
            target,
            active_connections: AtomicUsize::new(0),
        })
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}
