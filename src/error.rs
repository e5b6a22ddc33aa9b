//! Service error types with HTTP status code mapping.
//!
//! [`LensError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid time range: 5h",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category     | HTTP Status               |
/// |-----------|--------------|---------------------------|
/// | 1000–1999 | Validation   | 400 Bad Request           |
/// | 2000–2999 | Not Found    | 404 Not Found             |
/// | 3000–3999 | Server/Store | 500 Internal / 502 Upstream |
#[derive(Debug, thiserror::Error)]
pub enum LensError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown time-range token.
    #[error("invalid time range: {0}")]
    InvalidRange(String),

    /// Source with the given ID was not found.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// Setting with the given key was not found.
    #[error("setting not found: {0}")]
    SettingNotFound(String),

    /// Persistence layer failure.
    #[error("store error: {0}")]
    Store(String),

    /// Upstream log API failure (network error or non-200 response).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LensError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidRange(_) => 1002,
            Self::SourceNotFound(_) => 2001,
            Self::SettingNotFound(_) => 2002,
            Self::Store(_) => 3001,
            Self::Upstream(_) => 3002,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidRange(_) => StatusCode::BAD_REQUEST,
            Self::SourceNotFound(_) | Self::SettingNotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<sqlx::Error> for LensError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl IntoResponse for LensError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
