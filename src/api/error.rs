//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend call failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Backend(e) => match e {
                BackendError::Unavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE")
                }
                BackendError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_TIMEOUT"),
                BackendError::Config(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "BACKEND_NOT_CONFIGURED")
                }
                _ => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_status() {
        let cases = [
            (BackendError::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (BackendError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
            (
                BackendError::Api {
                    status: 401,
                    message: "bad key".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (BackendError::Decode("eof".to_string()), StatusCode::BAD_GATEWAY),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status_and_code().0, expected);
        }
    }

    #[test]
    fn test_validation_is_bad_request() {
        let response = ApiError::Validation("empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
