//! API route configuration.

use crate::api::handlers::{analytics_handler, shorten_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Routes mounted under `/api`.
///
/// - `POST /shorten`           - Create (or reuse) a short link
/// - `GET  /analytics/{code}`  - Click analytics for a link
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/analytics/{code}", get(analytics_handler))
}
