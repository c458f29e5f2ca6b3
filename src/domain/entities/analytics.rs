//! Click analytics aggregated per day.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Clicks recorded for a link on one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub day: NaiveDate,
    pub clicks: i64,
}

/// Analytics snapshot for a short link over a trailing window of days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub code: String,
    pub original_url: String,
    pub days: u32,
    pub total_clicks: i64,
    pub window_clicks: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub daily: Vec<DailyStat>,
    pub generated_at: DateTime<Utc>,
}

/// Expands sparse per-day rows into one entry per day of the window ending
/// at `today`, oldest first. Days without a row report zero clicks and rows
/// outside the window are ignored.
pub fn fill_daily_window(rows: &[DailyStat], days: u32, today: NaiveDate) -> Vec<DailyStat> {
    let start = today - Duration::days(i64::from(days.saturating_sub(1)));

    start
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|day| DailyStat {
            day,
            clicks: rows
                .iter()
                .filter(|r| r.day == day)
                .map(|r| r.clicks)
                .sum(),
        })
        .collect()
}
