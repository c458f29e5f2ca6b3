//! Validation gate applied to URLs before they are shortened.

use std::fmt;

use serde::Serialize;
use url::Url;

/// Maximum accepted URL length in bytes.
pub const MAX_URL_LENGTH: usize = 2048;

/// Why a candidate URL was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlRejection {
    Empty,
    TooLong,
    Malformed,
    UnsupportedScheme,
    MissingHost,
    BlockedDomain,
}

impl fmt::Display for UrlRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Empty => "URL is empty",
            Self::TooLong => "URL is too long",
            Self::Malformed => "URL could not be parsed",
            Self::UnsupportedScheme => "only http and https URLs are allowed",
            Self::MissingHost => "URL has no host",
            Self::BlockedDomain => "URL points to a blocked domain",
        };
        f.write_str(reason)
    }
}

/// Accepts or rejects a candidate URL.
#[cfg_attr(test, mockall::automock)]
pub trait UrlValidator: Send + Sync {
    /// # Errors
    ///
    /// Returns the [`UrlRejection`] class describing why the URL is not acceptable.
    fn validate(&self, url: &str) -> Result<(), UrlRejection>;
}

/// Scheme, host and block-list checks backed by the `url` crate.
#[derive(Debug, Clone, Default)]
pub struct DefaultUrlValidator {
    blocked_domains: Vec<String>,
}

impl DefaultUrlValidator {
    /// Creates a validator rejecting `blocked_domains` and their subdomains.
    pub fn new<I, S>(blocked_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocked_domains: blocked_domains
                .into_iter()
                .map(|d| d.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    fn is_blocked(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.blocked_domains.iter().any(|blocked| {
            host == *blocked
                || host
                    .strip_suffix(blocked.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

impl UrlValidator for DefaultUrlValidator {
    fn validate(&self, url: &str) -> Result<(), UrlRejection> {
        let url = url.trim();

        if url.is_empty() {
            return Err(UrlRejection::Empty);
        }
        if url.len() > MAX_URL_LENGTH {
            return Err(UrlRejection::TooLong);
        }

        let parsed = Url::parse(url).map_err(|_| UrlRejection::Malformed)?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UrlRejection::UnsupportedScheme);
        }

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(UrlRejection::MissingHost)?;

        if self.is_blocked(host) {
            return Err(UrlRejection::BlockedDomain);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> DefaultUrlValidator {
        DefaultUrlValidator::new(["malware.example.com", "Phishing.test."])
    }

    #[test]
    fn test_accepts_http_and_https() {
        let v = validator();
        assert!(v.validate("https://example.com").is_ok());
        assert!(v.validate("http://example.com/path?q=1#frag").is_ok());
        assert!(v.validate("  https://example.com/padded  ").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validator().validate("   "), Err(UrlRejection::Empty));
    }

    #[test]
    fn test_rejects_too_long() {
        let url = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(validator().validate(&url), Err(UrlRejection::TooLong));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(
            validator().validate("not-a-url"),
            Err(UrlRejection::Malformed)
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        for url in ["ftp://example.com", "javascript:alert(1)", "file:///etc/passwd"] {
            assert_eq!(
                validator().validate(url),
                Err(UrlRejection::UnsupportedScheme),
                "{url}"
            );
        }
    }

    #[test]
    fn test_rejects_blocked_domain_and_subdomains() {
        let v = validator();
        assert_eq!(
            v.validate("https://malware.example.com/x"),
            Err(UrlRejection::BlockedDomain)
        );
        assert_eq!(
            v.validate("https://cdn.MALWARE.example.com"),
            Err(UrlRejection::BlockedDomain)
        );
        assert_eq!(
            v.validate("http://phishing.test"),
            Err(UrlRejection::BlockedDomain)
        );
        assert!(v.validate("https://notmalware.example.com").is_ok());
        assert!(v.validate("https://example.com").is_ok());
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(
            UrlRejection::UnsupportedScheme.to_string(),
            "only http and https URLs are allowed"
        );
    }
}
