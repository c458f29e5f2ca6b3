//! Short link entity mapping a code to its original URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shortening record.
///
/// `code` and `original_url` are immutable once created. Only the click
/// accounting fields change afterwards. Serialized as JSON when cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl ShortLink {
    /// Returns true if the link had expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Input data for creating a new short link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShortLink {
    pub code: String,
    pub original_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}
