//! Application layer services implementing business logic.
//!
//! Services coordinate the cache, the durable store and the id generator,
//! and give HTTP handlers a small API.
//!
//! - [`services::link_service::LinkService`] - Shorten and resolve
//! - [`services::analytics_service::AnalyticsService`] - Daily click analytics

pub mod services;
