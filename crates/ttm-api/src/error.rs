//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use ttm_worker::ServiceError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by handlers. The `Display` text is the `detail` field
/// of the response body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let detail = err.to_string();
        match err {
            ServiceError::Validation(_)
            | ServiceError::InvalidImage(_)
            | ServiceError::NotReady { .. } => Self::BadRequest(detail),
            ServiceError::NotFound(_) | ServiceError::ArtifactMissing(_) => Self::NotFound(detail),
            ServiceError::AlreadyFinished { .. } => Self::Conflict(detail),
            ServiceError::Unavailable(_) => Self::ServiceUnavailable(detail),
            ServiceError::Internal(msg) => Self::Internal(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// Marks a response built from [`ApiError::Internal`] so its detail can be
/// redacted by [`crate::middleware::redact_internal_errors`].
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorMarker;

/// Body sent instead of internal error details in production.
pub(crate) fn redacted_internal_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            detail: "An internal error occurred".to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let internal = matches!(self, ApiError::Internal(_));

        let mut response = (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response();
        if internal {
            response.extensions_mut().insert(InternalErrorMarker);
        }
        response
    }
}
