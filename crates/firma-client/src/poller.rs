//! # Bounded Status Poller
//!
//! The desktop side of the handshake: poll the status endpoint at a
//! fixed interval until the session reaches a terminal state or the
//! wall-clock wait exceeds the session TTL plus a grace period.
//!
//! There is no server push and no persistent connection. Cancellation
//! is dropping the returned future — the poller holds no state between
//! requests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use firma_session::SessionStatus;

use crate::client::SigningClient;
use crate::error::ClientError;

/// Poller timing configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status reads.
    pub interval: Duration,
    /// Extra wall-clock allowance past `expires_at` before giving up.
    /// Covers clock skew between client and server; past the deadline
    /// the server will report `expired` anyway.
    pub grace: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            grace: Duration::from_secs(30),
        }
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The signer completed the handshake.
    Signed {
        /// When the server recorded the signature.
        signed_at: DateTime<Utc>,
    },
    /// The session expired (TTL elapsed or superseded).
    Expired {
        /// Context from the server, when available.
        detail: Option<String>,
    },
    /// The session failed unrecoverably.
    Failed {
        /// Context from the server, when available.
        detail: Option<String>,
    },
    /// The deadline passed without the server reporting a terminal
    /// status. The caller should treat the session as dead and offer a
    /// fresh code.
    TimedOut,
}

/// Poll a session until it reaches a terminal state or the bounded wait
/// is exhausted.
///
/// Retryable failures (transport, `UNAVAILABLE`) are absorbed and the
/// loop keeps polling until its deadline; every other error is returned
/// immediately.
pub async fn poll_until_terminal(
    client: &SigningClient,
    document_id: Uuid,
    verification_code: &str,
    expires_at: DateTime<Utc>,
    config: &PollConfig,
) -> Result<PollOutcome, ClientError> {
    let grace = chrono::Duration::from_std(config.grace)
        .unwrap_or_else(|_| chrono::Duration::seconds(30));
    let deadline = expires_at + grace;

    loop {
        match client.status(document_id, verification_code).await {
            Ok(state) => match state.status {
                SessionStatus::Signed => {
                    return Ok(PollOutcome::Signed {
                        signed_at: state.last_updated,
                    })
                }
                SessionStatus::Expired => {
                    return Ok(PollOutcome::Expired {
                        detail: state.detail,
                    })
                }
                SessionStatus::Error => {
                    return Ok(PollOutcome::Failed {
                        detail: state.detail,
                    })
                }
                SessionStatus::Waiting | SessionStatus::Scanned => {
                    tracing::debug!(status = %state.status, "signing session still in progress");
                }
            },
            Err(err) if err.is_retryable() => {
                tracing::warn!(error = %err, "status poll failed, will retry");
            }
            Err(err) => return Err(err),
        }

        if Utc::now() > deadline {
            return Ok(PollOutcome::TimedOut);
        }
        tokio::time::sleep(config.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_protocol_timing() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(3));
        assert_eq!(config.grace, Duration::from_secs(30));
    }
}
