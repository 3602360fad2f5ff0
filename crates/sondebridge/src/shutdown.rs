//! Cooperative shutdown signal shared by the bridge tasks.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable shutdown signal.
///
/// Every clone observes the same signal. Once triggered it stays triggered.
#[derive(Debug, Clone)]
pub struct Shutdown {
    signal: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
        }
    }

    /// Signal every holder to stop.
    pub fn trigger(&self) {
        self.signal.send_replace(true);
    }

    /// Check if the signal has been sent.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.signal.borrow()
    }

    /// Wait until the signal is sent. Returns immediately if it already was.
    pub async fn wait(&self) {
        let mut rx = self.signal.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }

    /// Trigger the signal on Ctrl-C.
    ///
    /// Spawns a task on the current runtime.
    pub fn trigger_on_ctrl_c(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
                shutdown.trigger();
            }
        });
    }
}
