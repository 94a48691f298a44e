//! API error types with JSON responses.
//!
//! Every handler maps its failures to an [`ApiError`]; middleware never
//! rewrites a status, it only observes it.

use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error that can be returned from handlers and middleware.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400): missing or malformed client input.
    #[error("{0}")]
    BadRequest(String),

    /// Unauthenticated (401): the identity header is absent.
    #[error("{0}")]
    Unauthenticated(String),

    /// Unauthorized (401): the caller is not permitted. Responds with an empty body.
    #[error("unauthorized")]
    Unauthorized,

    /// Method not allowed (405).
    #[error("error: '{0}' not allowed")]
    MethodNotAllowed(Method),

    /// Internal server error (500).
    #[error("{0}")]
    Internal(String),

    /// Store error (500).
    #[error("{0}")]
    Store(#[from] update_router_store::StoreError),
}

impl ApiError {
    /// Get the error code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthenticated(_) | Self::Unauthorized => "UNAUTHORIZED",
            Self::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if matches!(self, Self::Unauthorized) {
            return status.into_response();
        }

        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
