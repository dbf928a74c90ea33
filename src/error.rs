//! Error taxonomy for the API boundary.
//!
//! `ApiError` is the single error kind surfaced by the auth, task, and HTTP
//! layers. Each kind maps to a fixed HTTP status without inspecting free-text
//! messages (spec §7), so the mapping lives entirely in the `IntoResponse`
//! implementation. `FieldError` carries structured, field-level validation
//! detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The taxonomy of failures that cross the API boundary.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed input — one entry per offending field.
    Validation(Vec<FieldError>),
    /// Duplicate unique key (e.g. email already registered).
    Conflict(String),
    /// Referenced entity does not exist; the payload names the entity kind.
    NotFound(&'static str),
    /// Authenticated but not permitted to perform `action`.
    Forbidden { action: &'static str },
    /// Missing, invalid, or expired credentials.
    Unauthenticated(&'static str),
    /// Unexpected internal failure.
    Internal(anyhow::Error),
}

impl ApiError {
    /// Shorthand for a single-field validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    /// The HTTP status class for this error kind.
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(_) => write!(f, "Validation error"),
            ApiError::Conflict(msg) => write!(f, "{msg}"),
            ApiError::NotFound(what) => write!(f, "{what} not found"),
            ApiError::Forbidden { action } => write!(f, "Not authorized to {action}"),
            ApiError::Unauthenticated(msg) => write!(f, "{msg}"),
            ApiError::Internal(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(fields) => json!({
                "error": "Validation error",
                "details": fields,
            }),
            ApiError::Internal(_) => json!({ "error": "Internal server error" }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
