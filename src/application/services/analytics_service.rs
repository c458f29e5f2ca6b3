//! Click analytics with a short-lived cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use crate::domain::entities::{Analytics, fill_daily_window};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{
    CacheService,
    keys::{analytics_key, get_json, set_json},
};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const MAX_WINDOW_DAYS: u32 = 365;

/// Default lifetime of cached analytics; shorter than the URL mapping TTL.
pub const DEFAULT_ANALYTICS_TTL: Duration = Duration::from_secs(900);

/// Maps a requested window to `1..=365`, falling back to 30 days.
pub fn window_days(requested: Option<i64>) -> u32 {
    requested
        .and_then(|d| u32::try_from(d).ok())
        .filter(|d| (1..=MAX_WINDOW_DAYS).contains(d))
        .unwrap_or(DEFAULT_WINDOW_DAYS)
}

/// Per-day click analytics, cache-aside over the durable store.
pub struct AnalyticsService<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
    cache: Arc<dyn CacheService>,
    ttl: Duration,
}

impl<L: LinkRepository + ?Sized> AnalyticsService<L> {
    pub fn new(link_repository: Arc<L>, cache: Arc<dyn CacheService>) -> Self {
        Self {
            link_repository,
            cache,
            ttl: DEFAULT_ANALYTICS_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns analytics for `code` over the last `days` days, today included.
    ///
    /// Expired links still report their history until swept. Clicks still
    /// buffered in cache counters appear after the next flush.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this code.
    /// Returns [`AppError::Internal`] on store errors.
    pub async fn get_analytics(&self, code: &str, days: u32) -> Result<Analytics, AppError> {
        let days = window_days(Some(i64::from(days)));
        let key = analytics_key(code, days);

        if let Some(cached) = get_json::<Analytics>(self.cache.as_ref(), &key).await
            && cached.code == code
        {
            return Ok(cached);
        }

        let link = self
            .link_repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

        let rows = self.link_repository.daily_stats(code, days).await?;

        let now = Utc::now();
        let daily = fill_daily_window(&rows, days, now.date_naive());
        let window_clicks = daily.iter().map(|d| d.clicks).sum();

        let analytics = Analytics {
            code: link.code,
            original_url: link.original_url,
            days,
            total_clicks: link.click_count,
            window_clicks,
            last_accessed_at: link.last_accessed_at,
            daily,
            generated_at: now,
        };

        set_json(self.cache.as_ref(), &key, &analytics, self.ttl).await;
        Ok(analytics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DailyStat, ShortLink};
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::MemoryCache;

    fn stored(code: &str) -> ShortLink {
        ShortLink {
            code: code.to_string(),
            original_url: "https://example.com".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            click_count: 12,
            last_accessed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_window_days() {
        assert_eq!(window_days(None), 30);
        assert_eq!(window_days(Some(7)), 7);
        assert_eq!(window_days(Some(1)), 1);
        assert_eq!(window_days(Some(365)), 365);
        assert_eq!(window_days(Some(0)), 30);
        assert_eq!(window_days(Some(366)), 30);
        assert_eq!(window_days(Some(-5)), 30);
    }

    #[tokio::test]
    async fn test_computes_and_caches() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .times(1)
            .returning(|code| Ok(Some(stored(code))));
        links
            .expect_daily_stats()
            .withf(|code, days| code == "abc" && *days == 7)
            .times(1)
            .returning(|_, _| {
                Ok(vec![DailyStat {
                    day: Utc::now().date_naive(),
                    clicks: 5,
                }])
            });

        let cache = Arc::new(MemoryCache::new());
        let service = AnalyticsService::new(Arc::new(links), cache.clone());

        let first = service.get_analytics("abc", 7).await.unwrap();
        assert_eq!(first.total_clicks, 12);
        assert_eq!(first.window_clicks, 5);
        assert_eq!(first.daily.len(), 7);
        assert_eq!(first.daily.last().unwrap().clicks, 5);

        // Served from the cache: the mocks allow a single store round.
        let second = service.get_analytics("abc", 7).await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_windows_are_cached_separately() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .times(2)
            .returning(|code| Ok(Some(stored(code))));
        links
            .expect_daily_stats()
            .times(2)
            .returning(|_, _| Ok(vec![]));

        let service = AnalyticsService::new(Arc::new(links), Arc::new(MemoryCache::new()));

        assert_eq!(service.get_analytics("abc", 7).await.unwrap().days, 7);
        assert_eq!(service.get_analytics("abc", 30).await.unwrap().days, 30);
    }

    #[tokio::test]
    async fn test_out_of_range_window_falls_back() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .returning(|code| Ok(Some(stored(code))));
        links
            .expect_daily_stats()
            .withf(|_, days| *days == DEFAULT_WINDOW_DAYS)
            .returning(|_, _| Ok(vec![]));

        let service = AnalyticsService::new(Arc::new(links), Arc::new(MemoryCache::new()));

        assert_eq!(service.get_analytics("abc", 0).await.unwrap().days, 30);
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| Ok(None));
        links.expect_daily_stats().times(0);

        let service = AnalyticsService::new(Arc::new(links), Arc::new(MemoryCache::new()));

        assert!(matches!(
            service.get_analytics("nope", 30).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }
}
