//! Centralized API error handling for GameHub
//!
//! This module provides a unified error type for API responses with proper
//! HTTP status code mapping and JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Server misconfigured: {0}")]
    Misconfigured(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::Misconfigured(_) => "MISCONFIGURED",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            // Duplicate email and double-link are reported as plain 400s
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to clients. Server-side details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::NotFound(m)
            | ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::Conflict(m)
            | ApiError::InvalidState(m)
            | ApiError::ValidationError(m)
            | ApiError::ServiceUnavailable(m) => m.clone(),
            ApiError::Upstream(_) => "Upstream service request failed".to_string(),
            ApiError::Misconfigured(_) => "Server is not configured for this operation".to_string(),
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Log server errors
        if status.is_server_error() {
            tracing::error!(error = %self, code = %error_code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = %error_code, "Client error occurred");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => ApiError::Conflict("Resource already exists".to_string()),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            ApiError::InvalidState("test".to_string()).error_code(),
            "INVALID_STATE"
        );
        assert_eq!(
            ApiError::Upstream("test".to_string()).error_code(),
            "UPSTREAM_ERROR"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Conflict("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Forbidden("test".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Upstream("test".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Misconfigured("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = ApiError::DatabaseError("relation \"documents\" does not exist".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = ApiError::BadRequest("Email already registered".to_string());
        assert_eq!(err.public_message(), "Email already registered");
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err: ApiError = StoreError::Duplicate("users.email".to_string()).into();
        assert_eq!(err.error_code(), "CONFLICT");
    }
}
