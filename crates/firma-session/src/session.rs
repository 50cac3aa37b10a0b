//! # Signing Session Record & Transitions
//!
//! [`SigningSession`] is the server-side record tracking one remote-signing
//! attempt. All transition methods are conditional: they inspect the
//! current persisted status (and the clock) and either apply exactly one
//! legal transition or return a structured [`SessionError`].
//!
//! The transition methods mutate `self` directly; serialization of
//! concurrent callers is the store's job (see [`crate::store`]), which
//! invokes these methods under a single write lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use firma_core::{DocumentId, Rut, VerificationCode};

use crate::error::SessionError;

// ── Status ───────────────────────────────────────────────────────────

/// Lifecycle status of a signing session.
///
/// Serialized lowercase to match the wire contract consumed by the
/// desktop poller and the mobile signing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session issued; the QR has not been scanned yet.
    Waiting,
    /// The signer opened the link and began identity verification.
    Scanned,
    /// Signature recorded. Terminal.
    Signed,
    /// TTL elapsed or session superseded by a newer one. Terminal.
    Expired,
    /// Unrecoverable failure (for example a hard identity rejection). Terminal.
    Error,
}

impl SessionStatus {
    /// Whether this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Signed | Self::Expired | Self::Error)
    }

    /// The canonical wire name of this status.
    ///
    /// No wildcard arm: adding a variant forces a compiler error here
    /// rather than silently falling through.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Scanned => "scanned",
            Self::Signed => "signed",
            Self::Expired => "expired",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Signature Record ─────────────────────────────────────────────────

/// Proof of the signature act, attached to a session when it reaches
/// `signed`. Immutable once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// The signer's validated RUT.
    pub signer_rut: Rut,
    /// When the signature was accepted.
    pub signed_at: DateTime<Utc>,
    /// Opaque signature payload produced by the signer's device.
    pub payload: String,
    /// SHA-256 digest of the payload, hex encoded. Lets auditors verify
    /// the stored payload without re-parsing device-specific formats.
    pub payload_digest: String,
}

impl SignatureRecord {
    /// Build a record for a payload, computing its digest.
    pub fn new(signer_rut: Rut, payload: impl Into<String>, signed_at: DateTime<Utc>) -> Self {
        let payload = payload.into();
        let payload_digest = hex_digest(payload.as_bytes());
        Self {
            signer_rut,
            signed_at,
            payload,
            payload_digest,
        }
    }
}

/// SHA-256 over `bytes`, rendered as lowercase hex.
fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut s = String::with_capacity(64);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
    }
    s
}

// ── Signing Session ──────────────────────────────────────────────────

/// The server-side record tracking the lifecycle of one remote-signing
/// attempt for a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningSession {
    /// Stable identifier for audit storage.
    pub id: Uuid,
    /// The document being signed.
    pub document_id: DocumentId,
    /// Single-use code binding the mobile session to this request.
    pub verification_code: VerificationCode,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Optional human-readable context for the current status (why a
    /// session expired early, what failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
    /// `created_at + TTL`; the session is unusable past this instant.
    pub expires_at: DateTime<Utc>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
    /// Present only when `status == signed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_record: Option<SignatureRecord>,
}

impl SigningSession {
    /// Create a fresh `waiting` session for a document.
    pub fn new(
        document_id: DocumentId,
        verification_code: VerificationCode,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            verification_code,
            status: SessionStatus::Waiting,
            detail: None,
            created_at: now,
            expires_at: now + ttl,
            updated_at: now,
            signature_record: None,
        }
    }

    /// Whether the TTL has elapsed for a still-active session.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now > self.expires_at
    }

    /// Flip an overdue session to `expired`. Returns whether a flip
    /// happened. Called on every read and write path before anything else,
    /// so expiry is observed lazily without a background sweep.
    pub(crate) fn apply_lazy_expiry(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_overdue(now) {
            self.status = SessionStatus::Expired;
            self.updated_at = now;
            true
        } else {
            false
        }
    }

    /// Reject writes against sessions that are expired, either by stored
    /// status or by the clock.
    fn guard_not_expired(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.apply_lazy_expiry(now);
        if self.status == SessionStatus::Expired {
            return Err(SessionError::Expired {
                document_id: self.document_id,
                expires_at: self.expires_at,
            });
        }
        Ok(())
    }

    /// `waiting → scanned`: the signer opened the link and began identity
    /// verification. Does not yet authorize the signature.
    ///
    /// Idempotent while `scanned`: a repeated call (a network retry from
    /// the mobile side) reports success without a second transition.
    /// Returns `true` when this call performed the transition.
    pub fn confirm_scan(&mut self, now: DateTime<Utc>) -> Result<bool, SessionError> {
        self.guard_not_expired(now)?;
        match self.status {
            SessionStatus::Waiting => {
                self.status = SessionStatus::Scanned;
                self.updated_at = now;
                Ok(true)
            }
            SessionStatus::Scanned => Ok(false),
            from @ (SessionStatus::Signed | SessionStatus::Error) => {
                Err(SessionError::InvalidTransition {
                    from,
                    to: SessionStatus::Scanned,
                    reason: "session already completed".into(),
                })
            }
            // guard_not_expired already rejected this status; keep the
            // arm total rather than panicking on an impossible state.
            SessionStatus::Expired => Err(SessionError::Expired {
                document_id: self.document_id,
                expires_at: self.expires_at,
            }),
        }
    }

    /// `scanned → signed`: record the signature. Terminal.
    ///
    /// A session that was never scanned is rejected — the two-step
    /// handshake requires an explicit mobile-side confirmation before any
    /// signature is accepted.
    pub fn submit_signature(
        &mut self,
        record: SignatureRecord,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.guard_not_expired(now)?;
        match self.status {
            SessionStatus::Scanned => {
                self.signature_record = Some(record);
                self.status = SessionStatus::Signed;
                self.updated_at = now;
                Ok(())
            }
            SessionStatus::Waiting => Err(SessionError::InvalidTransition {
                from: SessionStatus::Waiting,
                to: SessionStatus::Signed,
                reason: "signature requires a prior scan confirmation".into(),
            }),
            from @ (SessionStatus::Signed | SessionStatus::Error) => {
                Err(SessionError::InvalidTransition {
                    from,
                    to: SessionStatus::Signed,
                    reason: "session already completed".into(),
                })
            }
            // guard_not_expired already rejected this status; keep the
            // arm total rather than panicking on an impossible state.
            SessionStatus::Expired => Err(SessionError::Expired {
                document_id: self.document_id,
                expires_at: self.expires_at,
            }),
        }
    }

    /// Move a non-terminal session to `error` with a reason. Terminal.
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.guard_not_expired(now)?;
        if self.status.is_terminal() {
            return Err(SessionError::AlreadyTerminal {
                code: self.verification_code.clone(),
                status: self.status,
            });
        }
        self.status = SessionStatus::Error;
        self.detail = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }

    /// Expire a non-terminal session because a newer session replaced it.
    /// No-op on terminal sessions.
    pub(crate) fn supersede(&mut self, now: DateTime<Utc>) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Expired;
            self.detail = Some("superseded by a newer signing session".into());
            self.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
    }

    fn session() -> SigningSession {
        SigningSession::new(
            DocumentId::new(),
            VerificationCode::from_bytes([0x11; 16]),
            Duration::minutes(5),
            t0(),
        )
    }

    fn record(at: DateTime<Utc>) -> SignatureRecord {
        SignatureRecord::new(Rut::new("12345678-5").unwrap(), "payload-bytes", at)
    }

    #[test]
    fn new_session_is_waiting_with_ttl() {
        let s = session();
        assert_eq!(s.status, SessionStatus::Waiting);
        assert_eq!(s.expires_at - s.created_at, Duration::minutes(5));
        assert!(s.signature_record.is_none());
    }

    #[test]
    fn scan_then_sign_happy_path() {
        let mut s = session();
        let now = t0() + Duration::seconds(30);
        assert!(s.confirm_scan(now).unwrap());
        assert_eq!(s.status, SessionStatus::Scanned);

        let now = now + Duration::seconds(30);
        s.submit_signature(record(now), now).unwrap();
        assert_eq!(s.status, SessionStatus::Signed);
        let rec = s.signature_record.as_ref().unwrap();
        assert_eq!(rec.signer_rut.as_str(), "123456785");
        assert_eq!(rec.payload_digest.len(), 64);
    }

    #[test]
    fn sign_without_scan_is_rejected() {
        let mut s = session();
        let now = t0() + Duration::seconds(10);
        let err = s.submit_signature(record(now), now).unwrap_err();
        match err {
            SessionError::InvalidTransition { from, to, .. } => {
                assert_eq!(from, SessionStatus::Waiting);
                assert_eq!(to, SessionStatus::Signed);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        // The rejection leaves the session untouched.
        assert_eq!(s.status, SessionStatus::Waiting);
        assert!(s.signature_record.is_none());
    }

    #[test]
    fn scan_is_idempotent() {
        let mut s = session();
        let now = t0() + Duration::seconds(5);
        assert!(s.confirm_scan(now).unwrap());
        // Second call succeeds but reports no new transition.
        assert!(!s.confirm_scan(now + Duration::seconds(1)).unwrap());
        assert_eq!(s.status, SessionStatus::Scanned);
    }

    #[test]
    fn scan_after_signed_is_rejected() {
        let mut s = session();
        let now = t0() + Duration::seconds(5);
        s.confirm_scan(now).unwrap();
        s.submit_signature(record(now), now).unwrap();
        let err = s.confirm_scan(now + Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { from: SessionStatus::Signed, .. }));
    }

    #[test]
    fn double_sign_is_rejected_and_record_immutable() {
        let mut s = session();
        let now = t0() + Duration::seconds(5);
        s.confirm_scan(now).unwrap();
        s.submit_signature(record(now), now).unwrap();
        let first = s.signature_record.clone().unwrap();

        let later = now + Duration::seconds(2);
        let err = s
            .submit_signature(
                SignatureRecord::new(Rut::new("7654321-6").unwrap(), "other", later),
                later,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { from: SessionStatus::Signed, .. }));
        assert_eq!(s.signature_record.unwrap(), first);
    }

    #[test]
    fn lazy_expiry_rejects_scan() {
        let mut s = session();
        let late = t0() + Duration::minutes(6);
        let err = s.confirm_scan(late).unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));
        assert_eq!(s.status, SessionStatus::Expired);
    }

    #[test]
    fn lazy_expiry_rejects_sign_mid_flow() {
        let mut s = session();
        s.confirm_scan(t0() + Duration::seconds(10)).unwrap();
        let late = t0() + Duration::minutes(6);
        let err = s.submit_signature(record(late), late).unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));
        assert_eq!(s.status, SessionStatus::Expired);
        assert!(s.signature_record.is_none());
    }

    #[test]
    fn expiry_is_permanent() {
        let mut s = session();
        let late = t0() + Duration::minutes(6);
        assert!(s.confirm_scan(late).is_err());
        // Every subsequent write keeps failing with Expired, including ones
        // whose clock is before expires_at (status is already terminal).
        let err = s.confirm_scan(t0() + Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));
        let err = s
            .submit_signature(record(late), late)
            .unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));
    }

    #[test]
    fn exactly_at_deadline_still_accepted() {
        let mut s = session();
        // Overdue means strictly past expires_at.
        assert!(s.confirm_scan(s.expires_at).unwrap());
    }

    #[test]
    fn fail_moves_to_error_and_is_terminal() {
        let mut s = session();
        let now = t0() + Duration::seconds(5);
        s.confirm_scan(now).unwrap();
        s.fail("identity hard rejection", now).unwrap();
        assert_eq!(s.status, SessionStatus::Error);
        assert_eq!(s.detail.as_deref(), Some("identity hard rejection"));

        let err = s.fail("again", now).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyTerminal { status: SessionStatus::Error, .. }));
        let err = s.confirm_scan(now).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { from: SessionStatus::Error, .. }));
    }

    #[test]
    fn supersede_expires_active_session() {
        let mut s = session();
        s.supersede(t0() + Duration::seconds(1));
        assert_eq!(s.status, SessionStatus::Expired);
        assert!(s.detail.as_deref().unwrap().contains("superseded"));
    }

    #[test]
    fn supersede_leaves_signed_session_alone() {
        let mut s = session();
        let now = t0() + Duration::seconds(5);
        s.confirm_scan(now).unwrap();
        s.submit_signature(record(now), now).unwrap();
        s.supersede(now + Duration::seconds(1));
        assert_eq!(s.status, SessionStatus::Signed);
    }

    #[test]
    fn status_wire_names_are_lowercase() {
        assert_eq!(
            serde_json::to_value(SessionStatus::Waiting).unwrap(),
            serde_json::json!("waiting")
        );
        assert_eq!(
            serde_json::to_value(SessionStatus::Scanned).unwrap(),
            serde_json::json!("scanned")
        );
        assert_eq!(
            serde_json::to_value(SessionStatus::Signed).unwrap(),
            serde_json::json!("signed")
        );
        for status in [
            SessionStatus::Waiting,
            SessionStatus::Scanned,
            SessionStatus::Signed,
            SessionStatus::Expired,
            SessionStatus::Error,
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SessionStatus::Waiting.is_terminal());
        assert!(!SessionStatus::Scanned.is_terminal());
        assert!(SessionStatus::Signed.is_terminal());
        assert!(SessionStatus::Expired.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
    }

    #[test]
    fn signature_record_digest_is_stable() {
        let a = SignatureRecord::new(Rut::new("12345678-5").unwrap(), "abc", t0());
        let b = SignatureRecord::new(Rut::new("12345678-5").unwrap(), "abc", t0());
        assert_eq!(a.payload_digest, b.payload_digest);
        let c = SignatureRecord::new(Rut::new("12345678-5").unwrap(), "abd", t0());
        assert_ne!(a.payload_digest, c.payload_digest);
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut s = session();
        let now = t0() + Duration::seconds(5);
        s.confirm_scan(now).unwrap();
        s.submit_signature(record(now), now).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let parsed: SigningSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, SessionStatus::Signed);
        assert_eq!(parsed.verification_code, s.verification_code);
        assert_eq!(parsed.signature_record.unwrap(), s.signature_record.unwrap());
    }
}
