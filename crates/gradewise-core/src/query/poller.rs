//! Periodic refetch loop
//!
//! Runs a tick callback on a fixed interval until shut down. Used to keep
//! polled reads (recommendations) current while something is watching them.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Handle to a running poll loop
pub struct Poller {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Spawn the loop; the first tick runs immediately
    pub fn spawn<F, Fut>(every: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut timer = interval(every);
            log::debug!("[query:poller] Started with {:?} interval", every);

            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = &mut shutdown_rx => break,
                }
                // Shutdown drops a tick that is still running
                tokio::select! {
                    _ = tick() => {}
                    _ = &mut shutdown_rx => {
                        log::debug!("[query:poller] Shutdown interrupted a running tick");
                        break;
                    }
                }
            }
            log::debug!("[query:poller] Stopped");
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit
    ///
    /// Returns promptly even when a tick is blocked on a slow request.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            log::warn!("[query:poller] Poll task ended abnormally: {}", e);
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
