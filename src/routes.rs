//! Top-level router.
//!
//! # Route Structure
//!
//! - `GET  /{code}`                 - Short link redirect
//! - `GET  /health`                 - Health check: DB, cache, click queue
//! - `POST /api/shorten`            - Shorten a URL
//! - `GET  /api/analytics/{code}`   - Click analytics
//!
//! Every route is wrapped in request tracing; trailing slashes are trimmed.

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the application router over `state`.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/{code}", get(redirect_handler))
        .nest("/api", api::routes::api_routes())
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
