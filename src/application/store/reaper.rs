//! Periodic sweep of expired records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

use super::cache::WriteBackCache;
use crate::domain::clock::Clock;
use crate::domain::repositories::RecordRepository;
use crate::error::StoreError;

/// Deletes expired rows from the backing store and evicts them from the cache.
///
/// Bounds how long an expired record can occupy storage when it is never
/// looked up again.
pub struct ExpiryReaper<R: RecordRepository> {
    repository: Arc<R>,
    cache: Arc<WriteBackCache<R>>,
    clock: Arc<dyn Clock>,
}

impl<R: RecordRepository> ExpiryReaper<R> {
    pub fn new(repository: Arc<R>, cache: Arc<WriteBackCache<R>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            cache,
            clock,
        }
    }

    /// Runs one sweep. Returns the number of rows deleted from the store.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let codes = self.repository.delete_expired(now).await?;
        let evicted = self.cache.evict_codes(&codes, now).await;

        if codes.is_empty() {
            debug!("no expired records");
        } else {
            info!(deleted = codes.len(), evicted, "expired records swept");
        }

        Ok(codes.len())
    }

    /// Spawns the sweep loop. The first sweep runs one `period` after start.
    pub fn spawn(self: Arc<Self>, period: Duration) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // A failed sweep is retried on the next tick.
                        if let Err(e) = self.sweep().await {
                            error!(error = %e, "expiry sweep failed");
                        }
                    }
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("expiry reaper stopped");
        });

        info!(interval_secs = period.as_secs(), "expiry reaper started");

        ReaperHandle { shutdown_tx, task }
    }
}

pub struct ReaperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "expiry reaper terminated abnormally");
        }
    }
}
