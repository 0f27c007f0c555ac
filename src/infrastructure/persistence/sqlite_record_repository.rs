//! SQLite implementation of the record repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;

use crate::domain::entities::Record;
use crate::domain::repositories::RecordRepository;
use crate::error::StoreError;

const SCHEMA: &str = include_str!("schema.sql");
const PRAGMAS: &str = include_str!("pragmas.sql");

/// Rows per `INSERT` statement; keeps bind parameters well under SQLite's limit.
const MAX_ROWS_PER_STATEMENT: usize = 1000;

const SELECT_COLUMNS: &str = "SELECT code, target, title, created_at, expires_at FROM records";

#[derive(FromRow)]
struct RecordRow {
    code: String,
    target: String,
    title: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Record::new(
            row.code,
            row.target,
            row.title,
            row.created_at,
            row.expires_at,
        )
    }
}

/// SQLite repository for the durable record table.
///
/// Timestamps are stored as RFC 3339 text in UTC, so comparisons against a
/// bound `now` are plain string comparisons.
pub struct SqliteRecordRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteRecordRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Creates the table and indexes if missing and applies connection pragmas.
    ///
    /// Idempotent; run once before opening the store.
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(self.pool.as_ref()).await?;
        sqlx::raw_sql(PRAGMAS).execute(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordRepository for SqliteRecordRepository {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query_as::<_, RecordRow>(SELECT_COLUMNS)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Record>, StoreError> {
        let row = sqlx::query_as::<_, RecordRow>(&format!("{SELECT_COLUMNS} WHERE code = ?"))
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Record::from))
    }

    async fn upsert_batch(&self, records: &[Record]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for chunk in records.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO records (code, target, title, created_at, expires_at) ",
            );

            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.code.clone())
                    .push_bind(record.target.clone())
                    .push_bind(record.title.clone())
                    .push_bind(record.created_at)
                    .push_bind(record.expires_at);
            });

            builder.push(
                " ON CONFLICT(code) DO UPDATE SET \
                 target = excluded.target, \
                 title = excluded.title, \
                 created_at = excluded.created_at, \
                 expires_at = excluded.expires_at",
            );

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, code: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM records WHERE code = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(code)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_if_expired(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM records WHERE code = ? AND expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(code)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let codes = sqlx::query_scalar::<_, String>(
            "DELETE FROM records WHERE expires_at IS NOT NULL AND expires_at <= ? RETURNING code",
        )
        .bind(now)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(codes)
    }

    async fn list(
        &self,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "{SELECT_COLUMNS} \
             WHERE expires_at IS NULL OR expires_at > ? \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ? OFFSET ?"
        ))
        .bind(now)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn count(&self, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM records WHERE expires_at IS NULL OR expires_at > ?",
        )
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }
}
