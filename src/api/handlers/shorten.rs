//! Handler for the shorten endpoint.

use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::warn;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::application::services::LinkService;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::state::AppState;

/// Extra attempts after a clock regression before giving up with 503.
const CLOCK_RETRIES: usize = 3;

/// Creates a short link, or returns the existing active one for the URL.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/some/long/path",
///   "custom_alias": "promo",              // optional
///   "expires_at": "2030-01-01T00:00:00Z"  // optional
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "short_url": "https://sl.example/promo",
///   "short_code": "promo",
///   "original_url": "https://example.com/some/long/path",
///   "created_at": "2025-01-01T00:00:00Z",
///   "expires_at": "2030-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - 400 for an invalid URL, alias or expiry
/// - 409 if the alias is taken
/// - 503 if the node clock kept running backwards across all retries
/// - 500 if the link could not be stored
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let service: &LinkService<dyn LinkRepository> = &state.link_service;
    let url = payload.url.as_str();
    let alias = payload.custom_alias.as_deref();
    let expires_at = payload.expires_at;

    let strategy = ExponentialBackoff::from_millis(2)
        .max_delay(Duration::from_millis(50))
        .map(jitter)
        .take(CLOCK_RETRIES);

    let link = RetryIf::start(
        strategy,
        move || service.shorten(url, alias, expires_at),
        |e: &AppError| {
            let retry = e.is_transient();
            if retry {
                warn!(error = %e, "Retrying shorten");
            }
            retry
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse::from_link(&state.base_url, link)),
    ))
}
