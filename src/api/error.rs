//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use uuid::Uuid;

use crate::service::LintServiceError;

/// Standard error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// No document in the request (400)
    #[error("Missing BPMN document: {0}")]
    MissingDocument(String),

    /// Document present but not lintable (400)
    #[error("Invalid BPMN document: {0}")]
    InvalidDocument(String),

    /// Missing or wrong API key (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    #[allow(dead_code)] // Reserved for failures outside the lint pipeline
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingDocument(_) | ApiError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = match self {
            ApiError::MissingDocument(_) => "missing_document",
            ApiError::InvalidDocument(_) => "invalid_document",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Internal(_) => "internal_error",
        };

        tracing::error!(
            error_type = error_type,
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
        })
    }
}

// ============================================================================
// From conversions for service errors
// ============================================================================

impl From<LintServiceError> for ApiError {
    fn from(err: LintServiceError) -> Self {
        match err {
            LintServiceError::Parse(e) => ApiError::InvalidDocument(e.to_string()),
        }
    }
}
