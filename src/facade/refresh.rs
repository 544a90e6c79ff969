//! Periodic background refresh

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::Forge;

/// Handle to a running refresh loop
///
/// Dropping the handle without calling [`RefreshHandle::shutdown`] also stops
/// the loop, because the shutdown channel closes.
pub struct RefreshHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop the loop and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            debug!(error = %e, "refresh task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Forge {
    /// Refresh the snapshot every `interval` until shut down.
    ///
    /// Failed refreshes keep the previous snapshot and the loop carries on.
    pub fn spawn_refresh(&self, interval: Duration) -> RefreshHandle {
        let (tx, mut rx) = oneshot::channel::<()>();
        let forge = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "background refresh started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Errors are already logged by refresh()
                        let _ = forge.refresh().await;
                    }
                    _ = &mut rx => {
                        info!("background refresh stopped");
                        break;
                    }
                }
            }
        });

        RefreshHandle {
            shutdown: Some(tx),
            task,
        }
    }
}
