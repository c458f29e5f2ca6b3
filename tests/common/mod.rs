#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::routing::get;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use snowlink::api::handlers::{health_handler, redirect_handler};
use snowlink::api::routes::api_routes;
use snowlink::domain::click_event::ClickEvent;
use snowlink::domain::entities::{DailyStat, NewShortLink, ShortLink};
use snowlink::domain::repositories::LinkRepository;
use snowlink::error::AppError;
use snowlink::infrastructure::cache::{CacheError, CacheResult, CacheService};
use snowlink::state::{AppState, ServiceSettings};
use snowlink::utils::node_registry::NodeRegistry;

pub const BASE_URL: &str = "https://sl.test";

/// In-memory durable store with the same semantics as the PostgreSQL one.
#[derive(Default)]
pub struct InMemoryLinks {
    links: Mutex<HashMap<String, ShortLink>>,
    daily: Mutex<HashMap<(String, NaiveDate), i64>>,
    down: AtomicBool,
}

impl InMemoryLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record as-is, bypassing service validation.
    pub fn insert(&self, link: ShortLink) {
        self.links
            .lock()
            .unwrap()
            .insert(link.code.clone(), link);
    }

    pub fn get(&self, code: &str) -> Option<ShortLink> {
        self.links.lock().unwrap().get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn clicks(&self, code: &str) -> i64 {
        self.get(code).map_or(0, |l| l.click_count)
    }

    /// Makes every subsequent call fail like an unreachable database.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(AppError::internal("Database error", json!({})));
        }
        Ok(())
    }

    fn bump(&self, code: &str, delta: i64) -> bool {
        let now = Utc::now();
        let mut links = self.links.lock().unwrap();
        let Some(link) = links.get_mut(code) else {
            return false;
        };
        link.click_count += delta;
        link.last_accessed_at = Some(now);

        *self
            .daily
            .lock()
            .unwrap()
            .entry((code.to_string(), now.date_naive()))
            .or_default() += delta;
        true
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinks {
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError> {
        self.check()?;
        let mut links = self.links.lock().unwrap();
        if links.contains_key(&new_link.code) {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": "short_links_pkey" }),
            ));
        }

        let link = ShortLink {
            code: new_link.code,
            original_url: new_link.original_url,
            created_at: Utc::now(),
            expires_at: new_link.expires_at,
            click_count: 0,
            last_accessed_at: None,
        };
        links.insert(link.code.clone(), link.clone());
        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        self.check()?;
        Ok(self.get(code))
    }

    async fn find_by_original_url(
        &self,
        original_url: &str,
    ) -> Result<Option<ShortLink>, AppError> {
        self.check()?;
        let now = Utc::now();
        Ok(self
            .links
            .lock()
            .unwrap()
            .values()
            .filter(|l| l.original_url == original_url)
            .max_by_key(|l| (!l.is_expired_at(now), l.created_at))
            .cloned())
    }

    async fn increment_click_count(&self, code: &str) -> Result<bool, AppError> {
        self.check()?;
        Ok(self.bump(code, 1))
    }

    async fn add_clicks(&self, code: &str, delta: i64) -> Result<bool, AppError> {
        self.check()?;
        Ok(self.bump(code, delta))
    }

    async fn daily_stats(&self, code: &str, days: u32) -> Result<Vec<DailyStat>, AppError> {
        self.check()?;
        let today = Utc::now().date_naive();
        let since = today - ChronoDuration::days(i64::from(days));
        let mut rows: Vec<DailyStat> = self
            .daily
            .lock()
            .unwrap()
            .iter()
            .filter(|((c, day), _)| c == code && *day > since)
            .map(|((_, day), clicks)| DailyStat {
                day: *day,
                clicks: *clicks,
            })
            .collect();
        rows.sort_by_key(|r| r.day);
        Ok(rows)
    }

    async fn delete_expired(&self) -> Result<Vec<ShortLink>, AppError> {
        self.check()?;
        let now = Utc::now();
        let mut links = self.links.lock().unwrap();
        let expired: Vec<String> = links
            .values()
            .filter(|l| l.is_expired_at(now))
            .map(|l| l.code.clone())
            .collect();

        let removed: Vec<ShortLink> = expired.iter().filter_map(|c| links.remove(c)).collect();
        self.daily
            .lock()
            .unwrap()
            .retain(|(code, _), _| !expired.contains(code));
        Ok(removed)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.check()
    }
}

/// A cache whose backend is always unreachable.
pub struct FailingCache;

fn unreachable_err() -> CacheError {
    CacheError::Connection("connection refused".to_string())
}

#[async_trait]
impl CacheService for FailingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(unreachable_err())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(unreachable_err())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(unreachable_err())
    }

    async fn increment_counter(&self, _key: &str, _delta: i64) -> CacheResult<i64> {
        Err(unreachable_err())
    }

    async fn take_counters(&self, _limit: usize) -> CacheResult<Vec<(String, i64)>> {
        Err(unreachable_err())
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

pub fn link(code: &str, url: &str, expires_at: Option<DateTime<Utc>>) -> ShortLink {
    ShortLink {
        code: code.to_string(),
        original_url: url.to_string(),
        created_at: Utc::now() - ChronoDuration::days(3),
        expires_at,
        click_count: 0,
        last_accessed_at: None,
    }
}

pub fn create_test_state(
    links: Arc<InMemoryLinks>,
    cache: Arc<dyn CacheService>,
) -> (AppState, mpsc::Receiver<ClickEvent>) {
    let (tx, rx) = mpsc::channel(100);

    let settings = ServiceSettings {
        base_url: BASE_URL.to_string(),
        node_id: 7,
        blocked_domains: vec!["blocked.test".to_string()],
        ..ServiceSettings::default()
    };

    let state = AppState::new(links, cache, Arc::new(NodeRegistry::new()), tx, settings);

    (state, rx)
}

/// The application routes without path normalization.
pub fn test_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/{code}", get(redirect_handler))
        .nest("/api", api_routes())
        .with_state(state)
}
