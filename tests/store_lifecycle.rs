mod common;

use chrono::Duration;
use common::{
    FlakyRepository, base_time, eager_config, open_store, quiet_config, record, repository, seed,
    test_clock, test_pool, wait_until_persisted,
};
use snaplink::application::store::RetryPolicy;
use snaplink::domain::access_event::RequestMeta;
use snaplink::domain::entities::NewRecord;
use snaplink::domain::repositories::RecordRepository;
use snaplink::error::StoreError;
use std::sync::Arc;

#[tokio::test]
async fn test_create_is_readable_before_flush() {
    let pool = test_pool().await;
    let repo = repository(&pool);
    let store = open_store(repo.clone(), quiet_config(), test_clock()).await;

    let code = store
        .create(NewRecord::new("https://example.com"))
        .await
        .unwrap();

    let found = store.lookup(&code, RequestMeta::default()).await.unwrap();
    assert_eq!(found.target, "https://example.com");
    assert_eq!(code.len(), 6);

    // Nothing has reached the database yet.
    assert!(repo.find_by_code(&code).await.unwrap().is_none());
}

#[tokio::test]
async fn test_buffer_threshold_flushes_without_timer() {
    let pool = test_pool().await;
    let repo = repository(&pool);
    let store = open_store(repo.clone(), eager_config(), test_clock()).await;

    let code = store
        .create(NewRecord::new("https://example.com").with_title("Example"))
        .await
        .unwrap();

    assert!(wait_until_persisted(repo.as_ref(), &code).await);

    let persisted = repo.find_by_code(&code).await.unwrap().unwrap();
    assert_eq!(persisted.title.as_deref(), Some("Example"));
    assert_eq!(persisted.created_at, base_time());
}

#[tokio::test]
async fn test_record_expires_after_ttl() {
    let pool = test_pool().await;
    let clock = test_clock();
    let store = open_store(repository(&pool), quiet_config(), clock.clone()).await;

    let code = store
        .create(NewRecord::new("https://example.com").with_ttl(Duration::seconds(60)))
        .await
        .unwrap();

    assert!(store.lookup(&code, RequestMeta::default()).await.is_ok());

    clock.advance(Duration::seconds(59));
    assert!(store.lookup(&code, RequestMeta::default()).await.is_ok());

    clock.advance(Duration::seconds(1));
    let result = store.lookup(&code, RequestMeta::default()).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));

    // The expired entry was evicted on the failed lookup.
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_expired_slug_can_be_reused() {
    let pool = test_pool().await;
    let clock = test_clock();
    let store = open_store(repository(&pool), quiet_config(), clock.clone()).await;

    store
        .create(
            NewRecord::new("https://old.example.com")
                .with_slug("promo")
                .with_ttl(Duration::seconds(10)),
        )
        .await
        .unwrap();

    let taken = store
        .create(NewRecord::new("https://new.example.com").with_slug("promo"))
        .await;
    assert!(matches!(taken, Err(StoreError::AlreadyExists(_))));

    clock.advance(Duration::seconds(11));

    let code = store
        .create(NewRecord::new("https://new.example.com").with_slug("promo"))
        .await
        .unwrap();
    assert_eq!(code, "promo");

    let found = store.lookup("promo", RequestMeta::default()).await.unwrap();
    assert_eq!(found.target, "https://new.example.com");
}

#[tokio::test]
async fn test_concurrent_slug_claims_have_one_winner() {
    let pool = test_pool().await;
    let store = Arc::new(open_store(repository(&pool), quiet_config(), test_clock()).await);

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .create(NewRecord::new(format!("https://example.com/{i}")).with_slug("launch"))
                .await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(code) => {
                assert_eq!(code, "launch");
                winners += 1;
            }
            Err(StoreError::AlreadyExists(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 15);
}

#[tokio::test]
async fn test_shutdown_drains_and_reopen_lists_newest_first() {
    let pool = test_pool().await;
    let clock = test_clock();
    let store = open_store(repository(&pool), quiet_config(), clock.clone()).await;

    let mut codes = Vec::new();
    for i in 0..15 {
        let code = store
            .create(NewRecord::new(format!("https://example.com/{i}")))
            .await
            .unwrap();
        codes.push(code);
        clock.advance(Duration::seconds(1));
    }

    store.shutdown().await;

    let reopened = open_store(repository(&pool), quiet_config(), clock.clone()).await;
    assert_eq!(reopened.len().await, 15);

    let (page, count) = reopened.list(1, 10).await.unwrap();
    assert_eq!(count, 15);

    let listed: Vec<String> = page.into_iter().map(|r| r.code).collect();
    let newest: Vec<String> = codes.iter().rev().take(10).cloned().collect();
    assert_eq!(listed, newest);

    let (rest, _) = reopened.list(2, 10).await.unwrap();
    assert_eq!(rest.len(), 5);

    let first = reopened
        .lookup(&codes[0], RequestMeta::default())
        .await
        .unwrap();
    assert_eq!(first.target, "https://example.com/0");
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let pool = test_pool().await;
    let store = open_store(repository(&pool), quiet_config(), test_clock()).await;

    store.shutdown().await;
    store.shutdown().await;
}

#[tokio::test]
async fn test_flush_retries_until_write_succeeds() {
    let pool = test_pool().await;
    let repo = Arc::new(FlakyRepository::new(&pool, 2));
    let store = open_store(repo.clone(), eager_config(), test_clock()).await;

    let code = store
        .create(NewRecord::new("https://example.com"))
        .await
        .unwrap();

    assert!(wait_until_persisted(repo.as_ref(), &code).await);
    assert_eq!(repo.attempts(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_keep_record_in_cache_only() {
    let pool = test_pool().await;
    let repo = Arc::new(FlakyRepository::new(&pool, usize::MAX));
    let mut config = eager_config();
    config.flush.retry = RetryPolicy::new(2, std::time::Duration::from_millis(1));
    let store = open_store(repo.clone(), config, test_clock()).await;

    let code = store
        .create(NewRecord::new("https://example.com"))
        .await
        .unwrap();

    for _ in 0..200 {
        if repo.attempts() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(repo.attempts(), 2);
    assert!(repo.find_by_code(&code).await.unwrap().is_none());
    assert!(store.lookup(&code, RequestMeta::default()).await.is_ok());
}

#[tokio::test]
async fn test_delete_persisted_record() {
    let pool = test_pool().await;
    let repo = repository(&pool);
    seed(&pool, &[record("gone", "https://example.com", base_time(), None)]).await;
    let store = open_store(repo.clone(), quiet_config(), test_clock()).await;

    store.delete("gone").await.unwrap();

    assert!(matches!(
        store.lookup("gone", RequestMeta::default()).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(repo.find_by_code("gone").await.unwrap().is_none());
    assert!(matches!(
        store.delete("gone").await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_unflushed_record_is_never_persisted() {
    let pool = test_pool().await;
    let repo = repository(&pool);
    let store = open_store(repo.clone(), quiet_config(), test_clock()).await;

    let code = store
        .create(NewRecord::new("https://example.com"))
        .await
        .unwrap();
    store.delete(&code).await.unwrap();
    store.shutdown().await;

    assert!(repo.find_by_code(&code).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_recreated_slug_stays_deleted_after_shutdown() {
    let pool = test_pool().await;
    let repo = repository(&pool);
    let now = base_time();
    seed(
        &pool,
        &[record(
            "promo",
            "https://old.example.com",
            now - Duration::hours(2),
            Some(now - Duration::hours(1)),
        )],
    )
    .await;
    let store = open_store(repo.clone(), quiet_config(), test_clock()).await;

    store
        .create(NewRecord::new("https://new.example.com").with_slug("promo"))
        .await
        .unwrap();
    store.delete("promo").await.unwrap();

    assert!(matches!(
        store.lookup("promo", RequestMeta::default()).await,
        Err(StoreError::NotFound(_))
    ));

    store.shutdown().await;

    let persisted = repo.find_by_code("promo").await.unwrap();
    assert!(persisted.is_none_or(|r| r.target == "https://old.example.com"));

    let (page, count) = store.list(1, 10).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(count, 0);

    let reopened = open_store(repository(&pool), quiet_config(), test_clock()).await;
    assert!(matches!(
        reopened.lookup("promo", RequestMeta::default()).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_unknown_code_is_not_found() {
    let pool = test_pool().await;
    let store = open_store(repository(&pool), quiet_config(), test_clock()).await;

    assert!(matches!(
        store.delete("nope").await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_sweep_removes_expired_from_cache_and_database() {
    let pool = test_pool().await;
    let repo = repository(&pool);
    let now = base_time();
    seed(
        &pool,
        &[
            record("old", "https://a.example.com", now, Some(now - Duration::minutes(1))),
            record("live", "https://b.example.com", now, Some(now + Duration::days(1))),
            record("forever", "https://c.example.com", now, None),
        ],
    )
    .await;

    let store = open_store(repo.clone(), quiet_config(), test_clock()).await;
    // Expired rows are loaded at startup and held until swept.
    assert_eq!(store.len().await, 3);

    let swept = store.sweep_expired().await.unwrap();

    assert_eq!(swept, 1);
    assert_eq!(store.len().await, 2);
    assert!(repo.find_by_code("old").await.unwrap().is_none());
    assert!(repo.find_by_code("live").await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_rejects_invalid_paging() {
    let pool = test_pool().await;
    let store = open_store(repository(&pool), quiet_config(), test_clock()).await;

    assert!(matches!(
        store.list(0, 10).await,
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        store.list(1, 0).await,
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        store.list(i64::MAX, i64::MAX).await,
        Err(StoreError::Validation(_))
    ));
}

#[tokio::test]
async fn test_create_batch_reports_per_row_outcomes() {
    let pool = test_pool().await;
    let store = open_store(repository(&pool), quiet_config(), test_clock()).await;

    let results = store
        .create_batch(vec![
            NewRecord::new("https://a.example.com").with_slug("dup"),
            NewRecord::new("  "),
            NewRecord::new("https://b.example.com").with_slug("dup"),
            NewRecord::new("https://c.example.com"),
        ])
        .await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap(), "dup");
    assert!(matches!(results[1], Err(StoreError::Validation(_))));
    assert!(matches!(results[2], Err(StoreError::AlreadyExists(_))));
    assert!(results[3].is_ok());
}
