//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps session and identity errors to HTTP status codes with stable
//! machine-readable error codes, so the desktop and mobile clients can
//! render specific guidance ("code expired, generate a new one") instead
//! of parsing prose. Internal error details are never exposed to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use firma_session::SessionError;

use crate::identity::IdentityError;

/// Structured JSON error response body.
///
/// All error responses use this format across the API surface.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "EXPIRED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// The variants mirror the protocol's error taxonomy. Only
/// `ServiceUnavailable` is safe for clients to retry automatically; every
/// other class requires a new session or user action.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown document or unknown document/code pair (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// State transition attempted out of order (409).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Session TTL elapsed (410).
    #[error("expired: {0}")]
    Expired(String),

    /// The signer's identity proof was rejected (422).
    #[error("identity verification failed: {0}")]
    IdentityVerificationFailed(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422). Normalized with
    /// `Validation`: the client sent syntactically valid HTTP but
    /// semantically invalid content.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure, missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// Storage or infrastructure failure; retryable with backoff (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::Expired(_) => (StatusCode::GONE, "EXPIRED"),
            Self::IdentityVerificationFailed(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "IDENTITY_VERIFICATION_FAILED",
            ),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        // Log server-side errors for operator visibility.
        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convert session-layer errors to API errors with the protocol's
/// status mapping.
impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match &err {
            SessionError::NotFound { .. } => Self::NotFound(err.to_string()),
            SessionError::Expired { .. } => Self::Expired(err.to_string()),
            SessionError::InvalidTransition { .. } | SessionError::AlreadyTerminal { .. } => {
                Self::InvalidState(err.to_string())
            }
        }
    }
}

/// Convert identity verification failures to API errors. Whether the
/// session also moves to `error` is the route handler's decision, not
/// the conversion's.
impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        Self::IdentityVerificationFailed(err.to_string())
    }
}
