//! Shorten and resolve, cache-aside over the durable store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::domain::click_event::{ClickEvent, dispatch_click};
use crate::domain::entities::{NewShortLink, ShortLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{
    CacheService,
    keys::{get_json, original_url_key, set_json, url_key},
};
use crate::utils::code_generator::validate_custom_alias;
use crate::utils::node_registry::NodeRegistry;
use crate::utils::url_validator::{DefaultUrlValidator, UrlValidator};

pub const IDS_MINTED: &str = "snowlink_ids_minted_total";

/// Builds the public short URL for a code.
pub fn short_url(base_url: &str, code: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), code)
}

/// Default lifetime of cached URL mappings.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

/// Creates and resolves short links.
///
/// Reads go to the cache first and fall back to the durable store, which is
/// the source of truth. Cache failures never fail an operation; store
/// failures always do. New codes come from the node's snowflake generator,
/// with the store's uniqueness constraint on `code` as the backstop.
pub struct LinkService<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
    cache: Arc<dyn CacheService>,
    registry: Arc<NodeRegistry>,
    node_id: i64,
    validator: Arc<dyn UrlValidator>,
    click_tx: mpsc::Sender<ClickEvent>,
    url_ttl: Duration,
}

impl<L: LinkRepository + ?Sized> LinkService<L> {
    /// Creates a link service minting codes as `node_id`.
    ///
    /// Uses [`DefaultUrlValidator`] with no blocked domains and
    /// [`DEFAULT_URL_TTL`] until overridden.
    pub fn new(
        link_repository: Arc<L>,
        cache: Arc<dyn CacheService>,
        registry: Arc<NodeRegistry>,
        node_id: i64,
        click_tx: mpsc::Sender<ClickEvent>,
    ) -> Self {
        Self {
            link_repository,
            cache,
            registry,
            node_id,
            validator: Arc::new(DefaultUrlValidator::default()),
            click_tx,
            url_ttl: DEFAULT_URL_TTL,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn UrlValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    /// Shortens `original_url`, or returns its existing active link.
    ///
    /// # Flow
    ///
    /// 1. Validate the URL
    /// 2. Existing active mapping in the cache, then in the store, wins
    /// 3. Otherwise use the custom alias if free, or mint a code
    /// 4. Insert into the store, then populate both cache entries
    ///
    /// Two concurrent first-time calls for the same URL may both insert.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidUrl`] if the URL is rejected
    /// - [`AppError::Validation`] for a malformed alias or an expiry in the past
    /// - [`AppError::AliasTaken`] if the alias is already bound
    /// - [`AppError::ClockRegression`] if the generator refuses to mint (retryable)
    /// - [`AppError::CreateFailed`] if the insert fails
    /// - [`AppError::Internal`] if a store lookup fails
    pub async fn shorten(
        &self,
        original_url: &str,
        custom_alias: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ShortLink, AppError> {
        let original_url = original_url.trim();
        let now = Utc::now();

        self.validator
            .validate(original_url)
            .map_err(|reason| AppError::InvalidUrl {
                url: original_url.to_string(),
                reason,
            })?;

        if let Some(alias) = custom_alias {
            validate_custom_alias(alias)?;
        }

        if let Some(at) = expires_at
            && at <= now
        {
            return Err(AppError::bad_request(
                "Expiry must be in the future",
                json!({ "expires_at": at }),
            ));
        }

        let lurl_key = original_url_key(original_url);

        if let Some(link) = get_json::<ShortLink>(self.cache.as_ref(), &lurl_key).await
            && link.original_url == original_url
            && !link.is_expired_at(now)
        {
            debug!(code = %link.code, "Reusing cached short link");
            return Ok(link);
        }

        if let Some(link) = self
            .link_repository
            .find_by_original_url(original_url)
            .await?
            && !link.is_expired_at(now)
        {
            debug!(code = %link.code, "Reusing stored short link");
            self.populate(&link).await;
            return Ok(link);
        }

        let code = match custom_alias {
            Some(alias) => {
                if self.link_repository.find_by_code(alias).await?.is_some() {
                    return Err(AppError::AliasTaken {
                        alias: alias.to_string(),
                    });
                }
                alias.to_string()
            }
            None => self.mint_code()?,
        };

        let new_link = NewShortLink {
            code,
            original_url: original_url.to_string(),
            expires_at,
        };

        let link = self
            .link_repository
            .create(new_link)
            .await
            .map_err(|e| match (e, custom_alias) {
                (AppError::Conflict { .. }, Some(alias)) => AppError::AliasTaken {
                    alias: alias.to_string(),
                },
                (e, _) => {
                    error!(error = %e, "Failed to persist short link");
                    AppError::CreateFailed {
                        message: e.to_string(),
                    }
                }
            })?;

        info!(code = %link.code, "Created short link");

        self.populate(&link).await;
        Ok(link)
    }

    /// Resolves `code` to its link and queues one click.
    ///
    /// The click is handed to the background worker and never delays or
    /// alters the result.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no link has this code
    /// - [`AppError::Expired`] if the link's expiry has passed
    /// - [`AppError::Internal`] if the store lookup fails
    pub async fn resolve(&self, code: &str) -> Result<ShortLink, AppError> {
        let now = Utc::now();

        let cached = get_json::<ShortLink>(self.cache.as_ref(), &url_key(code))
            .await
            .filter(|link| link.code == code);

        let link = match cached {
            Some(link) => link,
            None => {
                let link = self
                    .link_repository
                    .find_by_code(code)
                    .await?
                    .ok_or_else(|| {
                        AppError::not_found("Short link not found", json!({ "code": code }))
                    })?;

                if !link.is_expired_at(now) {
                    set_json(self.cache.as_ref(), &url_key(code), &link, self.url_ttl).await;
                }
                link
            }
        };

        if let Some(expired_at) = link.expires_at.filter(|at| now >= *at) {
            return Err(AppError::Expired {
                code: link.code,
                expired_at,
            });
        }

        dispatch_click(&self.click_tx, code);
        Ok(link)
    }

    fn mint_code(&self) -> Result<String, AppError> {
        let id = self.registry.get_generator(self.node_id)?.generate()?;
        counter!(IDS_MINTED).increment(1);
        Ok(id.to_code())
    }

    /// Writes both mappings for `link`. Best-effort.
    async fn populate(&self, link: &ShortLink) {
        let cache = self.cache.as_ref();
        set_json(cache, &url_key(&link.code), link, self.url_ttl).await;
        set_json(cache, &original_url_key(&link.original_url), link, self.url_ttl).await;
    }
}
