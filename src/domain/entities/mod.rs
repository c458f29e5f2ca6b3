//! Core domain entities.
//!
//! - [`ShortLink`] - A code to URL mapping with click accounting
//! - [`Analytics`] / [`DailyStat`] - Per-day click aggregates
//!
//! Records are created from a separate input struct ([`NewShortLink`]).

pub mod analytics;
pub mod short_link;

pub use analytics::{Analytics, DailyStat, fill_daily_window};
pub use short_link::{NewShortLink, ShortLink};
