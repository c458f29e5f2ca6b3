//! Data Transfer Objects for API requests and responses.
//!
//! Request bodies are checked with `validator` before reaching the services.

pub mod analytics;
pub mod health;
pub mod shorten;
