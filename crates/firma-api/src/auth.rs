//! # Authentication Middleware
//!
//! Bearer-token middleware guarding the desktop-side routes (document
//! registration, session creation, status polling). The mobile
//! confirmation routes are deliberately outside this middleware: the
//! verification code itself is the credential a signer's phone presents,
//! and the signer has no operator token.
//!
//! Token comparison is constant-time (`subtle`) and the stored secret is
//! zeroized on drop.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::AppError;

/// A bearer token that never appears in debug output and is zeroized
/// when the last handle drops.
#[derive(Clone)]
pub struct SecretToken {
    inner: Arc<Zeroizing<String>>,
}

impl SecretToken {
    /// Wrap a token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Zeroizing::new(value.into())),
        }
    }

    /// Constant-time comparison against a presented token.
    pub fn matches(&self, presented: &str) -> bool {
        self.inner.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken(<redacted>)")
    }
}

/// Auth configuration injected as a request extension.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The expected token. `None` disables authentication.
    pub token: Option<SecretToken>,
}

/// Axum middleware enforcing `Authorization: Bearer <token>` when a
/// token is configured.
pub async fn auth_middleware(
    axum::Extension(config): axum::Extension<AuthConfig>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = &config.token else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if expected.matches(token) => next.run(req).await,
        Some(_) => AppError::Unauthorized("invalid bearer token".into()).into_response(),
        None => AppError::Unauthorized("missing bearer token".into()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_equal_tokens() {
        let token = SecretToken::new("s3cr3t-token");
        assert!(token.matches("s3cr3t-token"));
    }

    #[test]
    fn rejects_different_tokens() {
        let token = SecretToken::new("s3cr3t-token");
        assert!(!token.matches("other-token"));
        assert!(!token.matches("s3cr3t-token "));
        assert!(!token.matches(""));
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = SecretToken::new("s3cr3t-token");
        let debug = format!("{token:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("redacted"));
    }
}
