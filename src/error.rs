//! Application error taxonomy and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::utils::snowflake::IdError;
use crate::utils::url_validator::UrlRejection;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    details: Value,
}

/// Errors returned by the services and rendered by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid URL: {reason}")]
    InvalidUrl { url: String, reason: UrlRejection },

    #[error("Alias '{alias}' is already taken")]
    AliasTaken { alias: String },

    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("Generator misconfigured: {message}")]
    InvalidNodeId { message: String },

    #[error("ID generator refused to mint: {message}")]
    ClockRegression { message: String },

    #[error("Failed to persist short link: {message}")]
    CreateFailed { message: String },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("Short link '{code}' expired at {expired_at}")]
    Expired {
        code: String,
        expired_at: DateTime<Utc>,
    },

    #[error("{message}")]
    Conflict { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// True for faults where retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ClockRegression { .. })
    }

    /// Status code, stable machine-readable code and details for the error body.
    pub fn to_error_info(&self) -> (StatusCode, &'static str, Value) {
        match self {
            Self::InvalidUrl { url, reason } => (
                StatusCode::BAD_REQUEST,
                "invalid_url",
                json!({ "url": url, "reason": reason }),
            ),
            Self::AliasTaken { alias } => (
                StatusCode::CONFLICT,
                "alias_taken",
                json!({ "alias": alias }),
            ),
            Self::Validation { details, .. } => {
                (StatusCode::BAD_REQUEST, "validation_error", details.clone())
            }
            Self::InvalidNodeId { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "invalid_node_id",
                json!({}),
            ),
            Self::ClockRegression { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "clock_regression",
                json!({ "retryable": true }),
            ),
            Self::CreateFailed { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "create_failed",
                json!({}),
            ),
            Self::NotFound { details, .. } => (StatusCode::NOT_FOUND, "not_found", details.clone()),
            Self::Expired { code, expired_at } => (
                StatusCode::GONE,
                "expired",
                json!({ "code": code, "expired_at": expired_at }),
            ),
            Self::Conflict { details, .. } => (StatusCode::CONFLICT, "conflict", details.clone()),
            Self::Internal { details, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                details.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.to_error_info();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
        }

        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message: self.to_string(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: serde_json::Map<String, Value> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or_else(|| e.code.to_string(), ToString::to_string)
                    })
                    .collect();
                (field.to_string(), json!(messages))
            })
            .collect();

        Self::bad_request("Request validation failed", json!({ "fields": fields }))
    }
}

impl From<IdError> for AppError {
    fn from(e: IdError) -> Self {
        match e {
            IdError::InvalidNodeId { .. } => Self::InvalidNodeId {
                message: e.to_string(),
            },
            IdError::ClockRegression { .. } => Self::ClockRegression {
                message: e.to_string(),
            },
            IdError::ClockBeforeEpoch { .. } | IdError::TimestampOverflow { .. } => {
                Self::internal("ID generator clock out of range", json!({ "reason": e.to_string() }))
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        tracing::error!(error = %e, "Database error");
        AppError::internal("Database error", json!({}))
    }
}
