//! Repository trait for the durable record table.

use crate::domain::entities::Record;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for the durable copy of every record.
///
/// The repository never retries: write retries belong to the flush pipeline
/// and read failures surface to the caller immediately. Every time-dependent
/// query takes `now` from the caller so the cache and the store agree on what
/// "expired" means.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::SqliteRecordRepository`] - SQLite implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_record.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordRepository: Send + Sync + 'static {
    /// Checks liveness of the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the store is unreachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Loads every row, expired or not. Used once at startup to warm the cache.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on database errors.
    async fn load_all(&self) -> Result<Vec<Record>, StoreError>;

    /// Finds a single record by code, regardless of expiry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on database errors.
    async fn find_by_code(&self, code: &str) -> Result<Option<Record>, StoreError>;

    /// Inserts or replaces a batch of records atomically.
    ///
    /// Either every row of the batch commits or none does.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on database errors.
    async fn upsert_batch(&self, records: &[Record]) -> Result<(), StoreError>;

    /// Deletes a record by code if it is still live at `now`.
    ///
    /// Returns `Ok(true)` if a row was removed, `Ok(false)` if none matched.
    /// An expired row is left for the expiry paths.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on database errors.
    async fn delete(&self, code: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Deletes a record by code only if it is expired at `now`.
    ///
    /// Returns `Ok(true)` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on database errors.
    async fn delete_if_expired(&self, code: &str, now: DateTime<Utc>)
    -> Result<bool, StoreError>;

    /// Deletes every row expired at `now` and returns the removed codes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on database errors.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    /// Lists live records newest-first.
    ///
    /// # Arguments
    ///
    /// - `now` - Records expired at this instant are excluded
    /// - `offset` - Rows to skip
    /// - `limit` - Maximum rows to return
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on database errors.
    async fn list(
        &self,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Record>, StoreError>;

    /// Counts live records at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on database errors.
    async fn count(&self, now: DateTime<Utc>) -> Result<i64, StoreError>;
}
