//! Periodic cleanup of revoked and expired sessions.

use crate::domain::session::SessionStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    period: Duration,
    shutdown: Arc<Notify>,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>, period: Duration) -> Self {
        Self {
            store,
            period,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// One pass. Returns how many sessions were deleted.
    pub async fn sweep_once(&self) -> anyhow::Result<u64> {
        let purged = self.store.purge_expired(Utc::now()).await?;
        if purged > 0 {
            info!(purged, "swept dead sessions");
        } else {
            debug!("sweep found nothing to purge");
        }
        Ok(purged)
    }

    /// Starts the background loop. The first sweep runs immediately.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let shutdown = self.shutdown.clone();

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            error!(error = %e, "session sweep failed");
                        }
                    }
                    _ = shutdown.notified() => {
                        info!("session sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stops the background loop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
