//! PostgreSQL repository implementations.
//!
//! - [`PgLinkRepository`] - Short links, click counters and daily buckets

pub mod pg_link_repository;

pub use pg_link_repository::PgLinkRepository;
