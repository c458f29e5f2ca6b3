//! Handler for per-link click analytics.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::api::dto::analytics::{AnalyticsQuery, AnalyticsResponse};
use crate::application::services::link_service::short_url;
use crate::error::AppError;
use crate::state::AppState;

/// Returns click totals and a per-day series for one link.
///
/// # Endpoint
///
/// `GET /api/analytics/{code}?days=7`
///
/// `days` defaults to 30; values outside 1-365 fall back to 30.
///
/// # Errors
///
/// Returns 404 if the code does not exist.
pub async fn analytics_handler(
    Path(code): Path<String>,
    Query(query): Query<AnalyticsQuery>,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let analytics = state
        .analytics_service
        .get_analytics(&code, query.window())
        .await?;

    Ok(Json(AnalyticsResponse {
        short_url: short_url(&state.base_url, &analytics.code),
        analytics,
    }))
}
