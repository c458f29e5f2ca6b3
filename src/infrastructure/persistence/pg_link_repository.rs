//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{DailyStat, NewShortLink, ShortLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "code, original_url, created_at, expires_at, click_count, last_accessed_at";

#[derive(sqlx::FromRow)]
struct ShortLinkRow {
    code: String,
    original_url: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    click_count: i64,
    last_accessed_at: Option<DateTime<Utc>>,
}

impl From<ShortLinkRow> for ShortLink {
    fn from(r: ShortLinkRow) -> Self {
        Self {
            code: r.code,
            original_url: r.original_url,
            created_at: r.created_at,
            expires_at: r.expires_at,
            click_count: r.click_count,
            last_accessed_at: r.last_accessed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DailyStatRow {
    day: NaiveDate,
    clicks: i64,
}

/// PostgreSQL repository for short links and click accounting.
///
/// Queries are checked at runtime, so building the crate needs no database.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Adds `delta` to the counter, stamps the access time and bumps today's
    /// bucket, all in one statement.
    async fn bump_clicks(&self, code: &str, delta: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            WITH bumped AS (
                UPDATE short_links
                SET click_count = click_count + $2,
                    last_accessed_at = NOW()
                WHERE code = $1
                RETURNING code
            )
            INSERT INTO daily_clicks (code, day, clicks)
            SELECT code, (NOW() AT TIME ZONE 'UTC')::date, $2
            FROM bumped
            ON CONFLICT (code, day)
            DO UPDATE SET clicks = daily_clicks.clicks + EXCLUDED.clicks
            "#,
        )
        .bind(code)
        .bind(delta)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError> {
        let row = sqlx::query_as::<_, ShortLinkRow>(&format!(
            r#"
            INSERT INTO short_links (code, original_url, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(&new_link.code)
        .bind(&new_link.original_url)
        .bind(new_link.expires_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        let row = sqlx::query_as::<_, ShortLinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM short_links WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_original_url(
        &self,
        original_url: &str,
    ) -> Result<Option<ShortLink>, AppError> {
        let row = sqlx::query_as::<_, ShortLinkRow>(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM short_links
            WHERE original_url = $1
            ORDER BY (expires_at IS NULL OR expires_at > NOW()) DESC, created_at DESC
            LIMIT 1
            "#
        ))
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn increment_click_count(&self, code: &str) -> Result<bool, AppError> {
        self.bump_clicks(code, 1).await
    }

    async fn add_clicks(&self, code: &str, delta: i64) -> Result<bool, AppError> {
        self.bump_clicks(code, delta).await
    }

    async fn daily_stats(&self, code: &str, days: u32) -> Result<Vec<DailyStat>, AppError> {
        let days = i32::try_from(days).unwrap_or(i32::MAX);

        let rows = sqlx::query_as::<_, DailyStatRow>(
            r#"
            SELECT day, clicks
            FROM daily_clicks
            WHERE code = $1
              AND day > (NOW() AT TIME ZONE 'UTC')::date - $2::int
            ORDER BY day
            "#,
        )
        .bind(code)
        .bind(days)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| DailyStat {
                day: r.day,
                clicks: r.clicks,
            })
            .collect())
    }

    async fn delete_expired(&self) -> Result<Vec<ShortLink>, AppError> {
        let rows = sqlx::query_as::<_, ShortLinkRow>(&format!(
            r#"
            DELETE FROM short_links
            WHERE expires_at IS NOT NULL AND expires_at <= NOW()
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
