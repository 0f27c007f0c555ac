//! Write buffer and background flush worker.
//!
//! Newly created records are appended to a [`WriteBuffer`]. The buffer is
//! swapped out into a batch either on a timer tick or as soon as it reaches
//! its threshold, and batches travel over a bounded channel to a single worker
//! that persists them with [`retry_with_backoff`].
//!
//! # Accepted loss points
//!
//! - Batch channel full: the batch is dropped and a warning is logged.
//! - Retries exhausted: the records stay cache-only until the next restart.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use super::retry::{RetryPolicy, retry_with_backoff};
use crate::domain::entities::Record;
use crate::domain::repositories::RecordRepository;
use crate::telemetry;

/// Configuration for the flush pipeline.
#[derive(Debug, Clone, Copy)]
pub struct FlushConfig {
    /// Buffer length that triggers an immediate flush (default: 100)
    pub buffer_size: usize,
    /// Interval of the periodic flush (default: 5s)
    pub flush_interval: Duration,
    /// Capacity of the batch channel (default: 100)
    pub queue_capacity: usize,
    /// Retry policy for persisting one batch
    pub retry: RetryPolicy,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            flush_interval: Duration::from_secs(5),
            queue_capacity: 100,
            retry: RetryPolicy::default(),
        }
    }
}

/// Append-only buffer of records awaiting persistence.
///
/// Guarded by its own lock so that flush bookkeeping never contends with
/// cache reads.
pub struct WriteBuffer {
    pending: Mutex<Vec<Record>>,
    threshold: usize,
    batches: mpsc::Sender<Vec<Record>>,
}

impl WriteBuffer {
    /// Creates the buffer and returns the receiving end of its batch channel.
    pub fn new(threshold: usize, queue_capacity: usize) -> (Self, mpsc::Receiver<Vec<Record>>) {
        let threshold = threshold.max(1);
        let (batches, rx) = mpsc::channel(queue_capacity.max(1));

        let buffer = Self {
            pending: Mutex::new(Vec::with_capacity(threshold)),
            threshold,
            batches,
        };

        (buffer, rx)
    }

    /// Appends a record. Returns `true` once the buffer has reached its
    /// threshold and should be flushed.
    pub async fn push(&self, record: Record) -> bool {
        let mut pending = self.pending.lock().await;
        pending.push(record);
        pending.len() >= self.threshold
    }

    /// Removes a record that has not yet been captured into a batch.
    ///
    /// Returns `true` if it was found.
    pub async fn discard(&self, code: &str) -> bool {
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        pending.retain(|r| r.code != code);
        pending.len() != before
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Swaps the buffer for an empty one and returns what it held.
    pub async fn take(&self) -> Vec<Record> {
        let mut pending = self.pending.lock().await;
        std::mem::replace(&mut *pending, Vec::with_capacity(self.threshold))
    }

    /// Moves the buffered records into a batch and queues it for the worker.
    ///
    /// Never waits for channel space: a full channel drops the batch.
    pub async fn trigger(&self) {
        let batch = self.take().await;
        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        match self.batches.try_send(batch) {
            Ok(()) => debug!(count, "queued batch for flush"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(count, "flush channel full, dropping batch");
                telemetry::flush_batch_dropped();
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(count, "flush worker stopped, dropping batch");
                telemetry::flush_batch_dropped();
            }
        }
    }
}

/// Handle to the running flush worker.
pub struct FlushHandle {
    shutdown_tx: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl FlushHandle {
    /// Signals shutdown and waits until the worker has drained queued work.
    ///
    /// Must complete before the backing store is closed.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.worker.await {
            error!(error = %e, "flush worker terminated abnormally");
        }
    }
}

/// Starts the single flush worker as a background task.
pub fn spawn_flush_worker<R: RecordRepository>(
    buffer: Arc<WriteBuffer>,
    batches: mpsc::Receiver<Vec<Record>>,
    repository: Arc<R>,
    config: FlushConfig,
) -> FlushHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = tokio::spawn(flush_loop(buffer, batches, repository, config, shutdown_rx));

    info!(
        buffer_size = config.buffer_size,
        interval_ms = config.flush_interval.as_millis() as u64,
        "flush worker started"
    );

    FlushHandle {
        shutdown_tx,
        worker,
    }
}

/// The worker loop: timer ticks, incoming batches and shutdown.
async fn flush_loop<R: RecordRepository>(
    buffer: Arc<WriteBuffer>,
    mut batches: mpsc::Receiver<Vec<Record>>,
    repository: Arc<R>,
    config: FlushConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(config.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => buffer.trigger().await,
            Some(batch) = batches.recv() => {
                persist_batch(repository.as_ref(), batch, config.retry).await;
            }
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("flush worker received shutdown signal");
                    break;
                }
            }
        }
    }

    // Drain in creation order: queued batches first, then whatever is still
    // buffered. Nothing new is accepted once the channel is closed.
    batches.close();
    while let Ok(batch) = batches.try_recv() {
        persist_batch(repository.as_ref(), batch, config.retry).await;
    }

    let remaining = buffer.take().await;
    if !remaining.is_empty() {
        persist_batch(repository.as_ref(), remaining, config.retry).await;
    }

    info!("flush worker stopped");
}

/// Persists one batch as a single transactional upsert, with bounded retry.
async fn persist_batch<R: RecordRepository + ?Sized>(
    repository: &R,
    batch: Vec<Record>,
    policy: RetryPolicy,
) {
    let count = batch.len();
    let result = retry_with_backoff(policy, "flush", |_| repository.upsert_batch(&batch)).await;

    match result {
        Ok(()) => info!(count, "flushed records to database"),
        Err(e) => {
            error!(count, error = %e, "flush failed after retries, records remain cache-only");
            telemetry::flush_failed();
        }
    }
}
