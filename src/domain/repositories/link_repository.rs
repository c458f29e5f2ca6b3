//! Repository trait for the durable short link store.

use crate::domain::entities::{DailyStat, NewShortLink, ShortLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Durable storage for short links and their click accounting.
///
/// The store is the source of truth. It must enforce uniqueness of `code`,
/// which is the backstop against duplicate inserts.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new short link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the code already exists.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError>;

    /// Finds a link by its short code, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError>;

    /// Finds the link for an original URL.
    ///
    /// Several records may share a URL once older ones expire. Active records
    /// are preferred, then the most recently created.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_original_url(&self, original_url: &str)
    -> Result<Option<ShortLink>, AppError>;

    /// Adds one click in a single atomic statement, stamping `last_accessed_at`
    /// and today's daily bucket.
    ///
    /// Returns `false` if no link has this code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn increment_click_count(&self, code: &str) -> Result<bool, AppError>;

    /// Adds `delta` clicks accumulated elsewhere (e.g. a cache counter).
    ///
    /// Returns `false` if no link has this code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn add_clicks(&self, code: &str, delta: i64) -> Result<bool, AppError>;

    /// Per-day click counts for the last `days` days including today.
    /// Days without clicks are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn daily_stats(&self, code: &str, days: u32) -> Result<Vec<DailyStat>, AppError>;

    /// Deletes links whose expiry has passed and returns them.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn delete_expired(&self) -> Result<Vec<ShortLink>, AppError>;

    /// Verifies the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the store cannot be queried.
    async fn health_check(&self) -> Result<(), AppError>;
}
