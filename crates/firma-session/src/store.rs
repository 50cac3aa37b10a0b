//! # Concurrent Session Store
//!
//! In-memory store for signing sessions, keyed by verification code with
//! a secondary index from document to its current active session.
//!
//! All operations run under a single `parking_lot::RwLock` write lock
//! (reads too, because the lazy-expiry flip is a write), so every state
//! transition is a conditional update: inspect the current status, apply
//! at most one legal transition. Two racing `confirm_scan` calls observe
//! exactly one `waiting → scanned` transition; a `submit_signature`
//! racing ahead of `confirm_scan` is rejected deterministically.
//!
//! The lock is never held across an `.await` point — all methods are
//! synchronous and bounded.
//!
//! Sessions are never deleted by the protocol itself: terminal sessions
//! remain readable for audit. [`SessionStore::sweep_expired`] exists for
//! storage hygiene only; expiry correctness comes from the lazy checks on
//! every read and write.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use firma_core::{DocumentId, VerificationCode};

use crate::code::generate_code;
use crate::error::SessionError;
use crate::session::{SessionStatus, SignatureRecord, SigningSession};

struct Inner {
    /// Every session ever issued, keyed by its verification code.
    by_code: HashMap<VerificationCode, SigningSession>,
    /// The at-most-one non-terminal session per document.
    active_by_document: HashMap<DocumentId, VerificationCode>,
}

/// Thread-safe, cheaply cloneable session store. All clones share data.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                by_code: HashMap::new(),
                active_by_document: HashMap::new(),
            })),
        }
    }

    /// Issue a new `waiting` session for a document.
    ///
    /// Any prior non-terminal session for the same document is expired in
    /// the same critical section, so at most one active session per
    /// document exists at every instant observable from outside the lock.
    pub fn create(
        &self,
        document_id: DocumentId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> SigningSession {
        let mut inner = self.inner.write();

        if let Some(old_code) = inner.active_by_document.remove(&document_id) {
            if let Some(old) = inner.by_code.get_mut(&old_code) {
                old.supersede(now);
                tracing::info!(
                    document_id = %document_id,
                    code = %old_code,
                    "superseded prior signing session"
                );
            }
        }

        // A collision over 128 random bits is not expected within the
        // lifetime of the deployment; the loop still guarantees the key
        // is unique within this store.
        let code = loop {
            let candidate = generate_code();
            if !inner.by_code.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = SigningSession::new(document_id, code.clone(), ttl, now);
        inner.by_code.insert(code.clone(), session.clone());
        inner.active_by_document.insert(document_id, code);
        tracing::info!(
            document_id = %document_id,
            expires_at = %session.expires_at,
            "issued signing session"
        );
        session
    }

    /// Read the current status of a session, applying the lazy-expiry
    /// flip first. Safe to call arbitrarily often; the flip is the only
    /// write it performs.
    pub fn status(
        &self,
        document_id: DocumentId,
        code: &VerificationCode,
        now: DateTime<Utc>,
    ) -> Result<SigningSession, SessionError> {
        let mut inner = self.inner.write();
        let session = lookup_mut(&mut inner.by_code, document_id, code)?;
        if session.apply_lazy_expiry(now) {
            let snapshot = session.clone();
            clear_active(&mut inner, document_id, code);
            return Ok(snapshot);
        }
        Ok(session.clone())
    }

    /// `waiting → scanned`. Returns the session and whether this call
    /// performed the transition (false for an idempotent repeat).
    pub fn confirm_scan(
        &self,
        document_id: DocumentId,
        code: &VerificationCode,
        now: DateTime<Utc>,
    ) -> Result<(SigningSession, bool), SessionError> {
        let mut inner = self.inner.write();
        let session = lookup_mut(&mut inner.by_code, document_id, code)?;
        match session.confirm_scan(now) {
            Ok(transitioned) => {
                let snapshot = session.clone();
                if transitioned {
                    tracing::info!(document_id = %document_id, "signing session scanned");
                }
                Ok((snapshot, transitioned))
            }
            Err(err) => {
                if matches!(err, SessionError::Expired { .. }) {
                    clear_active(&mut inner, document_id, code);
                }
                Err(err)
            }
        }
    }

    /// `scanned → signed`. Terminal; the signature record is immutable
    /// once stored.
    pub fn submit_signature(
        &self,
        document_id: DocumentId,
        code: &VerificationCode,
        record: SignatureRecord,
        now: DateTime<Utc>,
    ) -> Result<SigningSession, SessionError> {
        let mut inner = self.inner.write();
        let session = lookup_mut(&mut inner.by_code, document_id, code)?;
        match session.submit_signature(record, now) {
            Ok(()) => {
                let snapshot = session.clone();
                clear_active(&mut inner, document_id, code);
                tracing::info!(document_id = %document_id, "signing session signed");
                Ok(snapshot)
            }
            Err(err) => {
                if matches!(err, SessionError::Expired { .. }) {
                    clear_active(&mut inner, document_id, code);
                }
                Err(err)
            }
        }
    }

    /// Move a session to `error` after an unrecoverable failure.
    pub fn fail(
        &self,
        document_id: DocumentId,
        code: &VerificationCode,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<SigningSession, SessionError> {
        let reason = reason.into();
        let mut inner = self.inner.write();
        let session = lookup_mut(&mut inner.by_code, document_id, code)?;
        match session.fail(reason.clone(), now) {
            Ok(()) => {
                let snapshot = session.clone();
                clear_active(&mut inner, document_id, code);
                tracing::warn!(document_id = %document_id, reason = %reason, "signing session failed");
                Ok(snapshot)
            }
            Err(err) => {
                if matches!(err, SessionError::Expired { .. }) {
                    clear_active(&mut inner, document_id, code);
                }
                Err(err)
            }
        }
    }

    /// Storage-hygiene sweep: flip every overdue session to `expired`.
    /// Returns how many sessions were flipped. Correctness never depends
    /// on this running; the lazy checks on each access already enforce
    /// expiry.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write();
        let mut flipped = Vec::new();
        for session in inner.by_code.values_mut() {
            if session.apply_lazy_expiry(now) {
                flipped.push((session.document_id, session.verification_code.clone()));
            }
        }
        for (document_id, code) in &flipped {
            clear_active(&mut inner, *document_id, code);
        }
        flipped.len()
    }

    /// Count sessions by status, for the metrics scrape.
    pub fn status_counts(&self) -> HashMap<SessionStatus, usize> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for session in inner.by_code.values() {
            *counts.entry(session.status).or_insert(0) += 1;
        }
        counts
    }

    /// Total sessions retained (terminal ones included).
    pub fn len(&self) -> usize {
        self.inner.read().by_code.len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of documents with an active (non-terminal) session.
    pub fn active_len(&self) -> usize {
        self.inner.read().active_by_document.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a `(document, code)` pair to its session. An unknown code and
/// a code issued for a different document are indistinguishable to the
/// caller: both are `NotFound`.
fn lookup_mut<'a>(
    by_code: &'a mut HashMap<VerificationCode, SigningSession>,
    document_id: DocumentId,
    code: &VerificationCode,
) -> Result<&'a mut SigningSession, SessionError> {
    match by_code.get_mut(code) {
        Some(session) if session.document_id == document_id => Ok(session),
        _ => Err(SessionError::NotFound { document_id }),
    }
}

/// Drop the active-session index entry if it still points at `code`.
fn clear_active(inner: &mut Inner, document_id: DocumentId, code: &VerificationCode) {
    if inner.active_by_document.get(&document_id) == Some(code) {
        inner.active_by_document.remove(&document_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use firma_core::Rut;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
    }

    fn ttl() -> Duration {
        Duration::minutes(5)
    }

    fn record(at: DateTime<Utc>) -> SignatureRecord {
        SignatureRecord::new(Rut::new("12345678-5").unwrap(), "sig-bytes", at)
    }

    #[test]
    fn create_then_status_is_waiting() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let session = store.create(doc, ttl(), t0());
        let read = store
            .status(doc, &session.verification_code, t0() + Duration::seconds(1))
            .unwrap();
        assert_eq!(read.status, SessionStatus::Waiting);
    }

    #[test]
    fn status_with_unknown_code_is_not_found() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        store.create(doc, ttl(), t0());
        let foreign = VerificationCode::from_bytes([0x99; 16]);
        let err = store.status(doc, &foreign, t0()).unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[test]
    fn status_with_wrong_document_is_not_found() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let session = store.create(doc, ttl(), t0());
        let other_doc = DocumentId::new();
        let err = store
            .status(other_doc, &session.verification_code, t0())
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[test]
    fn short_ttl_session_reads_expired() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let session = store.create(doc, Duration::seconds(1), t0());
        let read = store
            .status(doc, &session.verification_code, t0() + Duration::seconds(2))
            .unwrap();
        assert_eq!(read.status, SessionStatus::Expired);
        assert_eq!(store.active_len(), 0);
    }

    #[test]
    fn full_handshake_via_store() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let session = store.create(doc, ttl(), t0());
        let code = session.verification_code.clone();

        let now = t0() + Duration::seconds(10);
        let (scanned, transitioned) = store.confirm_scan(doc, &code, now).unwrap();
        assert!(transitioned);
        assert_eq!(scanned.status, SessionStatus::Scanned);

        let now = now + Duration::seconds(10);
        let signed = store.submit_signature(doc, &code, record(now), now).unwrap();
        assert_eq!(signed.status, SessionStatus::Signed);
        assert!(signed.signature_record.is_some());

        // A second submission is rejected without touching the record.
        let err = store
            .submit_signature(doc, &code, record(now), now + Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
    }

    #[test]
    fn sign_without_scan_fails_through_store() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let session = store.create(doc, ttl(), t0());
        let err = store
            .submit_signature(doc, &session.verification_code, record(t0()), t0())
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition { from: SessionStatus::Waiting, .. }
        ));
    }

    #[test]
    fn regeneration_supersedes_prior_session() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let first = store.create(doc, ttl(), t0());
        let second = store.create(doc, ttl(), t0() + Duration::seconds(30));
        assert_ne!(first.verification_code, second.verification_code);

        // The first session is now terminal; its code reads as expired
        // and rejects mobile writes.
        let read = store
            .status(doc, &first.verification_code, t0() + Duration::seconds(31))
            .unwrap();
        assert_eq!(read.status, SessionStatus::Expired);
        assert!(read.detail.as_deref().unwrap().contains("superseded"));
        let err = store
            .confirm_scan(doc, &first.verification_code, t0() + Duration::seconds(32))
            .unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));

        // The replacement is live.
        let read = store
            .status(doc, &second.verification_code, t0() + Duration::seconds(31))
            .unwrap();
        assert_eq!(read.status, SessionStatus::Waiting);
    }

    #[test]
    fn at_most_one_active_session_per_document() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        for i in 0..5 {
            store.create(doc, ttl(), t0() + Duration::seconds(i));
            assert_eq!(store.active_len(), 1);
        }
        // Five sessions retained for audit, one active.
        assert_eq!(store.len(), 5);
        let counts = store.status_counts();
        assert_eq!(counts.get(&SessionStatus::Waiting), Some(&1));
        assert_eq!(counts.get(&SessionStatus::Expired), Some(&4));
    }

    #[test]
    fn signed_session_does_not_block_new_sessions() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let first = store.create(doc, ttl(), t0());
        let now = t0() + Duration::seconds(5);
        store.confirm_scan(doc, &first.verification_code, now).unwrap();
        store
            .submit_signature(doc, &first.verification_code, record(now), now)
            .unwrap();
        assert_eq!(store.active_len(), 0);

        // Regenerating after completion must not disturb the signed record.
        let second = store.create(doc, ttl(), now + Duration::seconds(1));
        let first_read = store
            .status(doc, &first.verification_code, now + Duration::seconds(2))
            .unwrap();
        assert_eq!(first_read.status, SessionStatus::Signed);
        assert_eq!(
            store
                .status(doc, &second.verification_code, now + Duration::seconds(2))
                .unwrap()
                .status,
            SessionStatus::Waiting
        );
    }

    #[test]
    fn scan_idempotency_through_store() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let session = store.create(doc, ttl(), t0());
        let now = t0() + Duration::seconds(1);
        let (_, first) = store.confirm_scan(doc, &session.verification_code, now).unwrap();
        let (_, second) = store.confirm_scan(doc, &session.verification_code, now).unwrap();
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn fail_transitions_and_clears_active_index() {
        let store = SessionStore::new();
        let doc = DocumentId::new();
        let session = store.create(doc, ttl(), t0());
        let now = t0() + Duration::seconds(1);
        store.confirm_scan(doc, &session.verification_code, now).unwrap();
        let failed = store
            .fail(doc, &session.verification_code, "identity rejected", now)
            .unwrap();
        assert_eq!(failed.status, SessionStatus::Error);
        assert_eq!(store.active_len(), 0);
    }

    #[test]
    fn sweep_expires_overdue_sessions() {
        let store = SessionStore::new();
        let doc_a = DocumentId::new();
        let doc_b = DocumentId::new();
        store.create(doc_a, Duration::seconds(1), t0());
        store.create(doc_b, ttl(), t0());

        let flipped = store.sweep_expired(t0() + Duration::seconds(2));
        assert_eq!(flipped, 1);
        assert_eq!(store.active_len(), 1);

        // Sweeping again finds nothing new.
        assert_eq!(store.sweep_expired(t0() + Duration::seconds(3)), 0);
    }

    #[test]
    fn codes_are_unique_across_documents() {
        let store = SessionStore::new();
        let mut codes = std::collections::HashSet::new();
        for _ in 0..500 {
            let session = store.create(DocumentId::new(), ttl(), t0());
            assert!(codes.insert(session.verification_code));
        }
    }
}
