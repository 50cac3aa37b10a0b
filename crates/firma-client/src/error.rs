//! # Client Errors
//!
//! Transport failures keep the underlying `reqwest` error; API failures
//! carry the server's stable machine-readable error code so callers can
//! branch on `EXPIRED` vs `INVALID_STATE` without parsing prose.

use thiserror::Error;

/// Errors from the signing API client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The base URL could not be parsed.
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Transport-level failure (connection refused, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a structured error body.
    #[error("api error {code} (http {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Stable machine-readable code ("NOT_FOUND", "EXPIRED", ...).
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
}

impl ClientError {
    /// Whether a call may be retried automatically. Only transport
    /// failures and the server's `UNAVAILABLE` class qualify; all other
    /// errors require a new session or user action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { code, status, .. } => code == "UNAVAILABLE" || *status == 503,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_retryable() {
        let err = ClientError::Api {
            status: 503,
            code: "UNAVAILABLE".into(),
            message: "store offline".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn expired_is_not_retryable() {
        let err = ClientError::Api {
            status: 410,
            code: "EXPIRED".into(),
            message: "ttl elapsed".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn unexpected_body_is_not_retryable() {
        assert!(!ClientError::UnexpectedBody("trailing garbage".into()).is_retryable());
    }
}
