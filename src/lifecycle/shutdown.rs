//! Signal handling for graceful shutdown

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info};

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    pub async fn wait(&self) -> io::Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = sigint.recv() => {
                debug!("received SIGINT");
            }
        }
        Ok(())
    }

    /// Clear `running` once a signal arrives.
    ///
    /// The wait happens on a dedicated thread with its own current-thread
    /// runtime, leaving the main thread to the OS run loop.
    pub fn spawn_watcher(self, running: Arc<AtomicBool>) -> io::Result<thread::JoinHandle<()>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("shutdown-signal".to_string())
            .spawn(move || match runtime.block_on(self.wait()) {
                Ok(()) => {
                    info!("shutdown signal received");
                    running.store(false, Ordering::SeqCst);
                }
                Err(e) => error!(?e, "failed to register signal handlers"),
            })
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, task};

    #[tokio::test]
    async fn test_wait_pending_without_signal() {
        let signal = ShutdownSignal::new();
        let mut wait = task::spawn(signal.wait());
        assert_pending!(wait.poll());
    }
}
