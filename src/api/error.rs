use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::publish::PublishError;
use crate::store::StoreError;

/// Unified request-level error type.
///
/// Every failure is recovered at the request boundary: validation and
/// lookup mistakes map to 4xx, persistence and publishing failures map to
/// 500 with a log line, and nothing propagates as a process-level fault.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

/// API error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => ApiError::BadRequest(msg),
            StoreError::NotFound(id) => ApiError::NotFound(format!("no item with id {id}")),
            other => {
                tracing::error!(error = %other, "Feed store failure");
                ApiError::Internal("failed to save feed data".to_string())
            }
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(e: PublishError) -> Self {
        tracing::error!(error = %e, "Feed publish failure");
        ApiError::Internal("failed to generate feed XML".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
