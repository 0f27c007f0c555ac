//! Write-back cache: the authoritative view of live records for reads.
//!
//! Creates land here first and are handed to the [`WriteBuffer`] for
//! asynchronous persistence. Reads never touch the backing store. Deletes go
//! to the backing store first and only then drop the cached entry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::flush::WriteBuffer;
use crate::domain::clock::Clock;
use crate::domain::entities::{NewRecord, Record};
use crate::domain::repositories::RecordRepository;
use crate::error::StoreError;
use crate::telemetry;
use crate::utils::code_generator::{generate_code, validate_slug};

/// Code generation settings.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Length of the first generated candidate (default: 6)
    pub code_length: usize,
    /// Length used for every candidate after a collision (default: 6)
    pub fallback_code_length: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            fallback_code_length: 6,
        }
    }
}

pub struct WriteBackCache<R: RecordRepository> {
    records: RwLock<HashMap<String, Record>>,
    repository: Arc<R>,
    buffer: Arc<WriteBuffer>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<R: RecordRepository> WriteBackCache<R> {
    pub fn new(
        repository: Arc<R>,
        buffer: Arc<WriteBuffer>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            repository,
            buffer,
            clock,
            config,
        }
    }

    /// Populates the cache from a full load of the backing store.
    ///
    /// Expired rows are loaded too; reads filter them and the reaper removes
    /// them. Returns the number of cached entries.
    pub async fn warm(&self, loaded: Vec<Record>) -> usize {
        let mut records = self.records.write().await;
        records.extend(loaded.into_iter().map(|r| (r.code.clone(), r)));
        telemetry::set_records_stored(records.len());
        records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Creates a record and schedules it for persistence.
    ///
    /// The existence check and the insert happen under one write lock, so two
    /// concurrent creates of the same slug cannot both succeed. An expired
    /// entry does not reserve its code.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] for an empty target or a malformed slug
    /// - [`StoreError::AlreadyExists`] if the slug is held by a live record
    pub async fn create(&self, new: NewRecord) -> Result<String, StoreError> {
        if new.target.trim().is_empty() {
            return Err(StoreError::Validation("target must not be empty".into()));
        }

        let slug = new.slug.clone().filter(|s| !s.is_empty());
        if let Some(slug) = &slug {
            validate_slug(slug)?;
        }

        let now = self.clock.now();
        let record = {
            let mut records = self.records.write().await;

            let code = match slug {
                Some(slug) => {
                    if records.get(&slug).is_some_and(|r| !r.is_expired_at(now)) {
                        return Err(StoreError::AlreadyExists(slug));
                    }
                    slug
                }
                None => self.free_code(&records),
            };

            let record = new.into_record(code.clone(), now);
            records.insert(code, record.clone());
            telemetry::set_records_stored(records.len());
            record
        };

        let code = record.code.clone();
        debug!(code = %code, "record cached");

        if self.buffer.push(record).await {
            self.buffer.trigger().await;
        }
        telemetry::record_created();

        Ok(code)
    }

    /// Resolves a code from the cache alone.
    ///
    /// An expired hit is evicted and its durable row deleted in the
    /// background; the caller sees [`StoreError::NotFound`] either way.
    pub async fn lookup(&self, code: &str) -> Result<Record, StoreError> {
        let now = self.clock.now();
        let cached = self.records.read().await.get(code).cloned();

        match cached {
            Some(record) if !record.is_expired_at(now) => Ok(record),
            Some(_) => {
                self.evict_expired(code, now).await;
                Err(StoreError::NotFound(code.to_string()))
            }
            None => Err(StoreError::NotFound(code.to_string())),
        }
    }

    /// Deletes a record from the backing store, the write buffer and the cache.
    ///
    /// A record that has not been flushed yet only needs dropping from the
    /// buffer. Two cases are not covered:
    ///
    /// - A record already captured into an in-flight batch can still
    ///   reappear after it lands.
    /// - A record left cache-only after its flush retries were exhausted is
    ///   in neither the database nor the buffer, so it reports
    ///   [`StoreError::NotFound`] although lookups still resolve it until
    ///   restart.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no live record has this code
    /// - [`StoreError::Storage`] if the backing store fails; the cache is untouched
    pub async fn delete(&self, code: &str) -> Result<(), StoreError> {
        let now = self.clock.now();
        let cached = self.records.read().await.get(code).cloned();

        if cached.as_ref().is_some_and(|r| r.is_expired_at(now)) {
            self.evict_expired(code, now).await;
            return Err(StoreError::NotFound(code.to_string()));
        }

        if self.repository.delete(code, now).await? {
            // A re-created slug may also be waiting in the buffer.
            self.buffer.discard(code).await;
            self.remove(code).await;
            telemetry::record_deleted();
            return Ok(());
        }

        if cached.is_some() && self.buffer.discard(code).await {
            debug!(code, "deleted record before it was flushed");
            self.remove(code).await;
            telemetry::record_deleted();
            return Ok(());
        }

        Err(StoreError::NotFound(code.to_string()))
    }

    /// Removes the given codes if they are still expired at `now`.
    ///
    /// A code re-created since the store-side sweep stays cached. Returns how
    /// many entries were removed.
    pub async fn evict_codes(&self, codes: &[String], now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let mut removed = 0;

        for code in codes {
            if records.get(code).is_some_and(|r| r.is_expired_at(now)) {
                records.remove(code);
                removed += 1;
            }
        }

        telemetry::set_records_stored(records.len());
        removed
    }

    /// Lazy eviction: drop the expired entry and delete its durable row in the
    /// background without blocking the caller.
    async fn evict_expired(&self, code: &str, now: DateTime<Utc>) {
        {
            let mut records = self.records.write().await;
            if records.get(code).is_some_and(|r| r.is_expired_at(now)) {
                records.remove(code);
                telemetry::set_records_stored(records.len());
            }
        }

        let repository = self.repository.clone();
        let code = code.to_string();
        tokio::spawn(async move {
            if let Err(e) = repository.delete_if_expired(&code, now).await {
                error!(code = %code, error = %e, "failed to delete expired record");
            }
        });
    }

    async fn remove(&self, code: &str) {
        let mut records = self.records.write().await;
        records.remove(code);
        telemetry::set_records_stored(records.len());
    }

    /// Draws candidates until one is free. The first uses the primary length,
    /// every retry the fallback length.
    fn free_code(&self, records: &HashMap<String, Record>) -> String {
        let mut code = generate_code(self.config.code_length);
        while records.contains_key(&code) {
            code = generate_code(self.config.fallback_code_length);
        }
        code
    }
}
