//! Write-back record store.
//!
//! # Architecture
//!
//! ```text
//! create ──► WriteBackCache ──► WriteBuffer ──► batch channel ──► flush worker ──► RecordRepository
//! lookup ──► WriteBackCache (read-only)
//! delete ──► RecordRepository ──► WriteBackCache
//! list   ──► RecordRepository
//!                      ExpiryReaper ──► RecordRepository + WriteBackCache
//! ```
//!
//! Writes are acknowledged once cached, before they are durable. A crash
//! between acknowledgement and flush loses those records, as does a batch
//! dropped by a full channel or one whose retries are exhausted.

pub mod cache;
pub mod flush;
pub mod reaper;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::access_event::{AccessEvent, RequestMeta};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::dispatcher::AccessNotifier;
use crate::domain::entities::{NewRecord, Record};
use crate::domain::repositories::RecordRepository;
use crate::error::StoreError;
use crate::telemetry;

pub use cache::{CacheConfig, WriteBackCache};
pub use flush::{FlushConfig, FlushHandle, WriteBuffer};
pub use reaper::{ExpiryReaper, ReaperHandle};
pub use retry::{RetryPolicy, retry_with_backoff};

/// Largest page [`Store::list`] will return.
pub const MAX_PER_PAGE: i64 = 1000;

/// Tunables of the store and its background tasks.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub cache: CacheConfig,
    pub flush: FlushConfig,
    /// Period of the expiry reaper (default: 24h)
    pub expiry_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            flush: FlushConfig::default(),
            expiry_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

struct Workers {
    flush: FlushHandle,
    reaper: ReaperHandle,
}

/// Facade over the cache, the flush pipeline and the expiry reaper.
///
/// Generic over the repository so the whole store can run against a mock or
/// an in-memory database in tests.
pub struct Store<R: RecordRepository> {
    cache: Arc<WriteBackCache<R>>,
    repository: Arc<R>,
    reaper: Arc<ExpiryReaper<R>>,
    clock: Arc<dyn Clock>,
    notifier: Option<Arc<dyn AccessNotifier>>,
    workers: Mutex<Option<Workers>>,
}

impl<R: RecordRepository> Store<R> {
    /// Opens the store on the wall clock. See [`Store::open_with_clock`].
    pub async fn open(repository: Arc<R>, config: StoreConfig) -> Result<Self, StoreError> {
        Self::open_with_clock(repository, config, Arc::new(SystemClock)).await
    }

    /// Loads every persisted record into the cache and starts the flush
    /// worker and the expiry reaper.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the initial load fails. No background
    /// task is started in that case.
    pub async fn open_with_clock(
        repository: Arc<R>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let loaded = repository.load_all().await?;

        let (buffer, batches) =
            WriteBuffer::new(config.flush.buffer_size, config.flush.queue_capacity);
        let buffer = Arc::new(buffer);

        let cache = Arc::new(WriteBackCache::new(
            repository.clone(),
            buffer.clone(),
            clock.clone(),
            config.cache,
        ));
        let cached = cache.warm(loaded).await;
        info!(count = cached, "record cache warmed");

        let flush = flush::spawn_flush_worker(buffer, batches, repository.clone(), config.flush);

        let reaper = Arc::new(ExpiryReaper::new(
            repository.clone(),
            cache.clone(),
            clock.clone(),
        ));
        let reaper_handle = reaper.clone().spawn(config.expiry_interval);

        Ok(Self {
            cache,
            repository,
            reaper,
            clock,
            notifier: None,
            workers: Mutex::new(Some(Workers {
                flush,
                reaper: reaper_handle,
            })),
        })
    }

    /// Attaches a sink that receives one [`AccessEvent`] per successful lookup.
    pub fn with_notifier(mut self, notifier: Arc<dyn AccessNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Creates a record and returns its code.
    ///
    /// Returns once the record is cached; persistence happens later.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] for an empty target or a malformed slug
    /// - [`StoreError::AlreadyExists`] if the slug is held by a live record
    pub async fn create(&self, new: NewRecord) -> Result<String, StoreError> {
        self.cache.create(new).await
    }

    /// Creates several records; one result per input, in input order.
    ///
    /// A failing row does not affect the others.
    pub async fn create_batch(&self, rows: Vec<NewRecord>) -> Vec<Result<String, StoreError>> {
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(self.cache.create(row).await);
        }
        results
    }

    /// Resolves a code. Never consults the backing store.
    ///
    /// On success an access event is handed to the notifier without waiting.
    pub async fn lookup(&self, code: &str, requester: RequestMeta) -> Result<Record, StoreError> {
        match self.cache.lookup(code).await {
            Ok(record) => {
                telemetry::redirect_succeeded();
                if let Some(notifier) = &self.notifier {
                    notifier.notify(AccessEvent::new(
                        record.code.clone(),
                        record.target.clone(),
                        requester,
                        self.clock.now(),
                    ));
                }
                Ok(record)
            }
            Err(e) => {
                telemetry::redirect_failed();
                Err(e)
            }
        }
    }

    /// Deletes a record durably.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no live record has this code
    /// - [`StoreError::Storage`] if the backing store fails
    pub async fn delete(&self, code: &str) -> Result<(), StoreError> {
        self.cache.delete(code).await
    }

    /// Pages through live records, newest first, as the backing store sees
    /// them. Records not yet flushed do not appear.
    ///
    /// Returns the page and the total number of live records.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if `page` or `per_page` is below 1, or
    ///   `per_page` exceeds [`MAX_PER_PAGE`]
    /// - [`StoreError::Storage`] on database errors
    pub async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<Record>, i64), StoreError> {
        if page < 1 || per_page < 1 {
            return Err(StoreError::Validation(format!(
                "page and per_page must be at least 1, got page={page} per_page={per_page}"
            )));
        }
        if per_page > MAX_PER_PAGE {
            return Err(StoreError::Validation(format!(
                "per_page must be at most {MAX_PER_PAGE}, got {per_page}"
            )));
        }

        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| StoreError::Validation("page is out of range".into()))?;

        let now = self.clock.now();
        let records = self.repository.list(now, offset, per_page).await?;
        let total = self.repository.count(now).await?;

        Ok((records, total))
    }

    /// Checks that the backing store is reachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.repository.ping().await
    }

    /// Runs one expiry sweep immediately.
    pub async fn sweep_expired(&self) -> Result<usize, StoreError> {
        self.reaper.sweep().await
    }

    /// Number of cached entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.cache.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.is_empty().await
    }

    /// Stops the reaper, then drains and stops the flush worker.
    ///
    /// Idempotent. Call before closing the backing store's pool.
    pub async fn shutdown(&self) {
        let Some(workers) = self.workers.lock().await.take() else {
            warn!("store already shut down");
            return;
        };

        workers.reaper.stop().await;
        workers.flush.close().await;

        info!("store shut down");
    }
}
