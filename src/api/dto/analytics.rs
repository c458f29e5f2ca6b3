//! DTOs for the analytics endpoint.

use serde::{Deserialize, Serialize};

use crate::application::services::analytics_service::window_days;
use crate::domain::entities::Analytics;

/// `?days=N`. Anything that is not a whole number in 1-365 means 30.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<String>,
}

impl AnalyticsQuery {
    pub fn window(&self) -> u32 {
        window_days(self.days.as_deref().and_then(|d| d.trim().parse().ok()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub short_url: String,
    #[serde(flatten)]
    pub analytics: Analytics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(days: Option<&str>) -> AnalyticsQuery {
        AnalyticsQuery {
            days: days.map(str::to_string),
        }
    }

    #[test]
    fn test_window_parsing() {
        assert_eq!(query(None).window(), 30);
        assert_eq!(query(Some("7")).window(), 7);
        assert_eq!(query(Some("400")).window(), 30);
        assert_eq!(query(Some("week")).window(), 30);
        assert_eq!(query(Some("-1")).window(), 30);
    }
}
