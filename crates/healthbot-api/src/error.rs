//! API error types and JSON error response formatting.
//!
//! Every error body carries the human-readable reason in `error`, which
//! clients treat as a failed request whatever the status code. `code` is the
//! machine-readable kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use healthbot_core::HealthbotError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable reason (e.g., "Empty message").
    pub error: String,
    /// Machine-readable error code (e.g., "bad_request").
    pub code: &'static str,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 Bad Request - missing or empty input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// 500 Internal Server Error - history could not be read or written.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = ErrorBody {
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<HealthbotError> for ApiError {
    fn from(err: HealthbotError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
