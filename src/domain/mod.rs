//! Domain layer containing business entities and background jobs.
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click event model and non-blocking dispatch
//! - [`click_worker`] - Applies queued clicks, cache first
//! - [`click_flusher`] - Moves cached click counters into the store
//! - [`expiry_sweeper`] - Deletes expired links and evicts their cache entries
//!
//! # Click Processing Flow
//!
//! 1. A successful resolve queues a [`click_event::ClickEvent`] (never blocks)
//! 2. [`click_worker::run_click_worker`] increments the cache counter, or the
//!    store directly if the cache errors
//! 3. [`click_flusher::run_click_flusher`] periodically adds cached counters
//!    to the store through [`repositories::LinkRepository::add_clicks`]

pub mod click_event;
pub mod click_flusher;
pub mod click_worker;
pub mod entities;
pub mod expiry_sweeper;
pub mod repositories;
