//! # Validation Errors
//!
//! Structured errors raised by identifier constructors. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations and
//! carry the offending input for diagnostics.

use thiserror::Error;

/// Errors from validated-type constructors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// RUT failed format or check-digit validation.
    #[error("invalid RUT: {0:?}")]
    InvalidRut(String),

    /// Verification code is not 32 lowercase hex characters.
    #[error("invalid verification code: {0:?}")]
    InvalidVerificationCode(String),
}
