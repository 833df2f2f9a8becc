//! Error types for series-fetcher
//!
//! Only input validation and upstream page-fetch failures surface to the
//! caller; lookup, write-back, and cache persistence failures are absorbed
//! by the enrichment run and reflected only in the output shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Origin server rejected a series page fetch; the upstream status and
    /// raw body are propagated verbatim
    #[error("Upstream fetch failed with status {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        details: String,
    },

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "status": "error",
                    "message": msg,
                })),
            )
                .into_response(),
            ApiError::Upstream {
                status,
                message,
                details,
            } => {
                // A transport-level failure carries no real HTTP status;
                // anything unmappable becomes 502.
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (
                    status,
                    Json(json!({
                        "status": "error",
                        "message": message,
                        "details": details,
                    })),
                )
                    .into_response()
            }
            ApiError::Other(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": err.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
