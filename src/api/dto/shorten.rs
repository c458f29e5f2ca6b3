//! DTOs for the shorten endpoint.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::application::services::link_service::short_url;
use crate::domain::entities::ShortLink;

/// Alias alphabet; edge and reserved-word rules are enforced by the service.
static ALIAS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("alias regex is valid")
});

#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: String,

    #[validate(length(min = 3, max = 32, message = "Alias must be 3-32 characters"))]
    #[validate(regex(path = *ALIAS_REGEX, message = "Alias may only contain letters, digits, '-' and '_'"))]
    pub custom_alias: Option<String>,

    /// After this instant the link answers 410 Gone.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub short_url: String,
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShortenResponse {
    pub fn from_link(base_url: &str, link: ShortLink) -> Self {
        Self {
            short_url: short_url(base_url, &link.code),
            short_code: link.code,
            original_url: link.original_url,
            created_at: link.created_at,
            expires_at: link.expires_at,
        }
    }
}
