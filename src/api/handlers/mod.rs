//! HTTP request handlers.
//!
//! Handlers only translate between HTTP and the services in
//! [`crate::application::services`].

pub mod analytics;
pub mod health;
pub mod redirect;
pub mod shorten;

pub use analytics::analytics_handler;
pub use health::health_handler;
pub use redirect::redirect_handler;
pub use shorten::shorten_handler;
