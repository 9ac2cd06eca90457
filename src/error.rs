use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ApiResult
///
/// Result alias used by every fallible handler. The error half converts itself
/// into the appropriate HTTP response, so handlers stay focused on the happy path.
pub type ApiResult<T> = Result<T, ApiError>;

/// ApiError
///
/// The unified failure taxonomy of the application. Authorization failures come in
/// two tiers: the soft tier recovers with a redirect to the home page, while the
/// sensitive routes (role management, the viewer planner) surface an explicit
/// access-denied response. No variant is fatal to the process; every failure path
/// produces a normal response.
#[derive(Debug)]
pub enum ApiError {
    /// Role check failed on a regular route. Recovered with a redirect to home.
    PermissionDenied,
    /// Role check failed on a sensitive route. Surfaced as an explicit 403.
    AccessDenied(String),
    /// Referenced id absent. Generic 404, no detail about what was probed.
    NotFound(String),
    /// Malformed input fields, reported back with field-level messages.
    Validation(Vec<FieldError>),
    /// Username already taken. User-facing message, not a hard failure.
    DuplicateUsername(String),
    /// Anonymous submission limit reached. Recovered with a redirect to login.
    QuotaExceeded,
    /// Unexpected failure. Detail is logged, never exposed to the client.
    Internal(String),
}

/// FieldError
///
/// A single field-level validation message, suitable for rendering next to the
/// offending form field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// ErrorResponse
///
/// The JSON body returned for the non-redirecting error variants.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code (e.g., "not_found", "duplicate_username").
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Field-level details, present only for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::PermissionDenied => write!(f, "Permission denied"),
            ApiError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Validation(errors) => {
                write!(f, "Validation failed: {} field(s)", errors.len())
            }
            ApiError::DuplicateUsername(msg) => write!(f, "Duplicate username: {}", msg),
            ApiError::QuotaExceeded => write!(f, "Anonymous post limit reached"),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Soft authorization failures mirror the classic dashboard behavior:
            // the caller lands back on the home page instead of a hard error.
            ApiError::PermissionDenied => Redirect::to("/").into_response(),
            // Quota exhaustion nudges the anonymous caller toward authentication.
            ApiError::QuotaExceeded => Redirect::to("/login").into_response(),

            ApiError::AccessDenied(message) => error_body(
                StatusCode::FORBIDDEN,
                "access_denied",
                message,
                None,
            ),
            ApiError::NotFound(message) => error_body(
                StatusCode::NOT_FOUND,
                "not_found",
                message,
                None,
            ),
            ApiError::Validation(details) => error_body(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(details),
            ),
            ApiError::DuplicateUsername(message) => error_body(
                StatusCode::CONFLICT,
                "duplicate_username",
                message,
                None,
            ),
            ApiError::Internal(detail) => {
                // Log the underlying failure but return a generic message.
                tracing::error!("internal error: {}", detail);
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        }
    }
}

fn error_body(
    status: StatusCode,
    code: &str,
    message: String,
    details: Option<Vec<FieldError>>,
) -> Response {
    let body = Json(ErrorResponse {
        error: code.to_string(),
        message,
        details,
    });
    (status, body).into_response()
}
