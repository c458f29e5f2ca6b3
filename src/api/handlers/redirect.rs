//! Handler for short code redirects.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// Answers `307 Temporary Redirect` so every visit comes back through the
/// service and is counted. The click is queued for the background worker;
/// a full queue drops it without delaying the redirect.
///
/// # Errors
///
/// - 404 if the code does not exist
/// - 410 if the link has expired
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let link = state.link_service.resolve(&code).await?;

    debug!(code = %code, "Redirecting");
    Ok(Redirect::temporary(&link.original_url))
}
