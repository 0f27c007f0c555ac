#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use chrono::{DateTime, TimeZone, Utc};
use snaplink::application::store::{FlushConfig, RetryPolicy, Store, StoreConfig};
use snaplink::domain::clock::{Clock, ManualClock};
use snaplink::domain::entities::Record;
use snaplink::domain::repositories::RecordRepository;
use snaplink::error::StoreError;
use snaplink::infrastructure::persistence::SqliteRecordRepository;
use snaplink::state::AppState;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::Layer;

pub const PUBLIC_URL: &str = "https://s.example.com";

/// Fixed instant every test clock starts from.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(base_time()))
}

/// In-memory database with the schema applied.
///
/// A single connection that never idles out, since every new connection to
/// `sqlite::memory:` would see an empty database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    SqliteRecordRepository::new(Arc::new(pool.clone()))
        .bootstrap()
        .await
        .unwrap();

    pool
}

pub fn repository(pool: &SqlitePool) -> Arc<SqliteRecordRepository> {
    Arc::new(SqliteRecordRepository::new(Arc::new(pool.clone())))
}

/// Store settings that keep background work out of the way: the timer and
/// the reaper effectively never fire, and retries are fast.
pub fn quiet_config() -> StoreConfig {
    StoreConfig {
        flush: FlushConfig {
            flush_interval: Duration::from_secs(3600),
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
            ..FlushConfig::default()
        },
        expiry_interval: Duration::from_secs(3600),
        ..StoreConfig::default()
    }
}

/// Like [`quiet_config`] but every create is flushed straight away.
pub fn eager_config() -> StoreConfig {
    let mut config = quiet_config();
    config.flush.buffer_size = 1;
    config
}

pub async fn open_store<R: RecordRepository>(
    repository: Arc<R>,
    config: StoreConfig,
    clock: Arc<ManualClock>,
) -> Store<R> {
    let clock: Arc<dyn Clock> = clock;
    Store::open_with_clock(repository, config, clock)
        .await
        .unwrap()
}

pub async fn create_test_state(pool: &SqlitePool, clock: Arc<ManualClock>) -> AppState {
    let store = open_store(repository(pool), quiet_config(), clock).await;
    AppState::new(Arc::new(store), PUBLIC_URL)
}

pub fn record(
    code: &str,
    target: &str,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Record {
    Record::new(
        code.to_string(),
        target.to_string(),
        None,
        created_at,
        expires_at,
    )
}

/// Writes records straight to the database, bypassing any store.
pub async fn seed(pool: &SqlitePool, records: &[Record]) {
    repository(pool).upsert_batch(records).await.unwrap();
}

/// Polls until `code` is in the database or the deadline passes.
pub async fn wait_until_persisted<R: RecordRepository>(repository: &R, code: &str) -> bool {
    for _ in 0..200 {
        if repository.find_by_code(code).await.unwrap().is_some() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Repository whose first `failures` batch writes fail.
pub struct FlakyRepository {
    inner: SqliteRecordRepository,
    failures: usize,
    attempts: AtomicUsize,
}

impl FlakyRepository {
    pub fn new(pool: &SqlitePool, failures: usize) -> Self {
        Self {
            inner: SqliteRecordRepository::new(Arc::new(pool.clone())),
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordRepository for FlakyRepository {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn load_all(&self) -> Result<Vec<Record>, StoreError> {
        self.inner.load_all().await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Record>, StoreError> {
        self.inner.find_by_code(code).await
    }

    async fn upsert_batch(&self, records: &[Record]) -> Result<(), StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(StoreError::Storage(sqlx::Error::PoolTimedOut));
        }
        self.inner.upsert_batch(records).await
    }

    async fn delete(&self, code: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.inner.delete(code, now).await
    }

    async fn delete_if_expired(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.inner.delete_if_expired(code, now).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        self.inner.delete_expired(now).await
    }

    async fn list(
        &self,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Record>, StoreError> {
        self.inner.list(now, offset, limit).await
    }

    async fn count(&self, now: DateTime<Utc>) -> Result<i64, StoreError> {
        self.inner.count(now).await
    }
}

/// Injects a fixed peer address, standing in for
/// `into_make_service_with_connect_info`.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
