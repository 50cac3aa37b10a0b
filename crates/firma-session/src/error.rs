//! # Session Errors
//!
//! Structured errors for session lookups and state transitions. Each
//! variant carries the context a caller needs to render specific guidance:
//! an expired code asks for regeneration, an out-of-order transition asks
//! for a fresh scan.

use chrono::{DateTime, Utc};
use thiserror::Error;

use firma_core::{DocumentId, VerificationCode};

use crate::session::SessionStatus;

/// Errors during signing-session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the given document/code pair.
    #[error("no signing session for document {document_id} with the given code")]
    NotFound {
        /// The document the caller named.
        document_id: DocumentId,
    },

    /// The session's TTL has elapsed; no further writes are accepted.
    #[error("signing session for document {document_id} expired at {expires_at}")]
    Expired {
        /// The document the session belonged to.
        document_id: DocumentId,
        /// When the session expired.
        expires_at: DateTime<Utc>,
    },

    /// Transition attempted out of order (for example signing a session
    /// that was never scanned, or scanning a signed one).
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        /// Current persisted status.
        from: SessionStatus,
        /// Attempted target status.
        to: SessionStatus,
        /// Why the transition was rejected.
        reason: String,
    },

    /// The session is already in a terminal state.
    #[error("signing session {code} is terminal ({status})")]
    AlreadyTerminal {
        /// The session's verification code.
        code: VerificationCode,
        /// The terminal status.
        status: SessionStatus,
    },
}
