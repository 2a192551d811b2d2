//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::DomainError;
use crate::pagination::PaginationError;
use crate::storage::StorageError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// HTTP status, stable error code and optional payload for the response body
    fn parts(&self) -> (StatusCode, &'static str, Option<Value>) {
        match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request", None),
            AppError::MissingHeader(_) => (StatusCode::BAD_REQUEST, "missing_header", None),
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "invalid_api_key", None),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", None),

            AppError::Domain(domain_err) => match domain_err {
                DomainError::CourseNotFound(_) => {
                    (StatusCode::NOT_FOUND, "course_not_found", None)
                }
                DomainError::ModuleNotFound(_) => {
                    (StatusCode::NOT_FOUND, "module_not_found", None)
                }
                DomainError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found", None),
                DomainError::AlreadyEnrolled { balance, .. } => (
                    StatusCode::CONFLICT,
                    "already_enrolled",
                    Some(json!({ "balance": balance })),
                ),
                DomainError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate_value", None),
                DomainError::InsufficientBalance { available, .. } => (
                    StatusCode::PAYMENT_REQUIRED,
                    "insufficient_balance",
                    Some(json!({ "balance": available })),
                ),
                DomainError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input", None),
                DomainError::ProtectedUser(_) => (StatusCode::FORBIDDEN, "protected_user", None),
            },

            AppError::Pagination(e) if e.is_invalid_input() => {
                (StatusCode::BAD_REQUEST, "invalid_pagination", None)
            }
            AppError::Pagination(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }

            AppError::Storage(StorageError::EmptyUpload(_)) => {
                (StatusCode::BAD_REQUEST, "empty_upload", None)
            }
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None),

            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None),
        }
    }
}

fn log_rejection(err: &DomainError, error_code: &'static str) {
    if err.is_conflict_error() {
        tracing::info!(
            error_code = error_code,
            "Request conflicts with existing state: {}",
            err
        );
    } else if err.is_client_error() || err.is_not_found() {
        tracing::debug!(error_code = error_code, "Request rejected: {}", err);
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    pub error_code: &'static str,
    pub data: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, data) = self.parts();

        // Server-side details stay in the log
        let message = if status.is_server_error() {
            tracing::error!(error_code = error_code, "{:?}", self);
            "Internal server error".to_string()
        } else {
            if let AppError::Domain(domain_err) = &self {
                log_rejection(domain_err, error_code);
            }
            self.to_string()
        };

        let body = ErrorResponse {
            status: "error",
            message,
            error_code,
            data,
        };

        (status, Json(body)).into_response()
    }
}
