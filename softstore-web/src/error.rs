//! Error types for the HTTP layer

use crate::store::StoreError;
use crate::submission::SubmissionError;
use axum::{
    extract::multipart::MultipartError,
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

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Multipart body could not be read (status taken from the rejection)
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Catalog store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Store(e) => ApiError::Store(e),
            SubmissionError::Task(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Multipart(err) => (err.status(), "BAD_MULTIPART"),
            ApiError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Error for HTML page handlers
///
/// Renders a plain error page; details go to the log, not the visitor.
#[derive(Debug)]
pub struct PageError(pub ApiError);

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        PageError(err)
    }
}

impl From<StoreError> for PageError {
    fn from(err: StoreError) -> Self {
        PageError(err.into())
    }
}

impl From<SubmissionError> for PageError {
    fn from(err: SubmissionError) -> Self {
        PageError(err.into())
    }
}

impl From<MultipartError> for PageError {
    fn from(err: MultipartError) -> Self {
        PageError(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, _) = self.0.status_and_code();
        if status.is_server_error() {
            tracing::error!("Page request failed: {}", self.0);
        } else {
            tracing::debug!("Page request rejected: {}", self.0);
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        (status, crate::api::pages::error_page(status.as_u16(), reason)).into_response()
    }
}

/// Result type for HTML page handlers
pub type PageResult<T> = Result<T, PageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_404() {
        let response = ApiError::Store(StoreError::NotFound("program 1".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_page_error_hides_details() {
        let response = PageError(ApiError::Internal("secret stack".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
