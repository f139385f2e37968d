//! Graceful interrupt handling.
//!
//! Coordinates ctrl-c with the progress display: the run is stopped, the
//! bar is abandoned cleanly, and the process exits with the conventional
//! interrupted status. In-flight completion calls are not force-cancelled;
//! output stays valid because every flush is atomic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Exit status reported when the run is interrupted (128 + SIGINT).
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Shutdown coordinator for graceful termination.
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    shutdown_requested: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.
    pub fn request_shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::SeqCst) {
            info!("Shutdown requested");
            self.shutdown_notify.notify_waiters();
        }
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Wait for the shutdown signal.
    pub async fn wait_for_shutdown(&self) {
        if self.is_shutdown_requested() {
            return;
        }
        self.shutdown_notify.notified().await;
    }

    /// Install a ctrl-c listener that requests shutdown.
    pub fn install_signal_handler(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                coordinator.request_shutdown();
            }
        })
    }
}
