//! PostgreSQL repository tests.
//!
//! Need a reachable database: `DATABASE_URL=... cargo test -- --ignored`.

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use snowlink::domain::entities::NewShortLink;
use snowlink::domain::repositories::LinkRepository;
use snowlink::error::AppError;
use snowlink::infrastructure::persistence::PgLinkRepository;

fn new_link(code: &str, url: &str) -> NewShortLink {
    NewShortLink {
        code: code.to_string(),
        original_url: url.to_string(),
        expires_at: None,
    }
}

async fn insert_expired(pool: &PgPool, code: &str, url: &str) {
    sqlx::query(
        "INSERT INTO short_links (code, original_url, created_at, expires_at)
         VALUES ($1, $2, NOW() - INTERVAL '2 days', NOW() - INTERVAL '1 hour')",
    )
    .bind(code)
    .bind(url)
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_create_and_find(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let created = repo
        .create(new_link("abc123", "https://example.com"))
        .await
        .unwrap();
    assert_eq!(created.code, "abc123");
    assert_eq!(created.click_count, 0);
    assert!(created.last_accessed_at.is_none());

    let found = repo.find_by_code("abc123").await.unwrap().unwrap();
    assert_eq!(found, created);

    assert!(repo.find_by_code("missing").await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_code_is_conflict(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    repo.create(new_link("dup", "https://example.com/1"))
        .await
        .unwrap();
    let err = repo
        .create(new_link("dup", "https://example.com/2"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_find_by_original_url_prefers_active(pool: PgPool) {
    insert_expired(&pool, "old", "https://example.com/x").await;
    let repo = PgLinkRepository::new(Arc::new(pool));

    let only_expired = repo
        .find_by_original_url("https://example.com/x")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(only_expired.code, "old");
    assert!(only_expired.is_expired());

    repo.create(new_link("new", "https://example.com/x"))
        .await
        .unwrap();

    let active = repo
        .find_by_original_url("https://example.com/x")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.code, "new");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_clicks_update_counter_and_daily_bucket(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    repo.create(new_link("hot", "https://example.com/hot"))
        .await
        .unwrap();

    assert!(repo.increment_click_count("hot").await.unwrap());
    assert!(repo.add_clicks("hot", 4).await.unwrap());
    assert!(!repo.add_clicks("missing", 4).await.unwrap());

    let link = repo.find_by_code("hot").await.unwrap().unwrap();
    assert_eq!(link.click_count, 5);
    assert!(link.last_accessed_at.is_some());

    let stats = repo.daily_stats("hot", 7).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].clicks, 5);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_daily_stats_respects_window(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));
    repo.create(new_link("hist", "https://example.com/hist"))
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO daily_clicks (code, day, clicks) VALUES
            ('hist', (NOW() AT TIME ZONE 'UTC')::date - 2, 3),
            ('hist', (NOW() AT TIME ZONE 'UTC')::date - 10, 8)",
    )
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(repo.daily_stats("hist", 7).await.unwrap().len(), 1);
    assert_eq!(repo.daily_stats("hist", 30).await.unwrap().len(), 2);
    assert!(repo.daily_stats("hist", 1).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_delete_expired(pool: PgPool) {
    insert_expired(&pool, "stale", "https://example.com/stale").await;
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));

    let future = NewShortLink {
        expires_at: Some(Utc::now() + ChronoDuration::days(1)),
        ..new_link("fresh", "https://example.com/fresh")
    };
    repo.create(future).await.unwrap();
    repo.add_clicks("stale", 2).await.unwrap();

    let removed = repo.delete_expired().await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].code, "stale");

    assert!(repo.find_by_code("stale").await.unwrap().is_none());
    assert!(repo.find_by_code("fresh").await.unwrap().is_some());

    let buckets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_clicks WHERE code = 'stale'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(buckets, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_health_check(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    assert!(repo.health_check().await.is_ok());
}
