//! Property tests for the signing state machine.
//!
//! Drives random operation sequences against the store and checks the
//! protocol's structural invariants: a signature is always preceded by a
//! scan, terminal states are absorbing, and at most one session per
//! document is active at any point.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use firma_core::{DocumentId, Rut};
use firma_session::{SessionStatus, SessionStore, SignatureRecord};

/// An abstract operation against a single document's session.
#[derive(Debug, Clone)]
enum Op {
    Create,
    Scan,
    Sign,
    Fail,
    /// Advance the clock by this many seconds.
    Advance(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Create),
        3 => Just(Op::Scan),
        3 => Just(Op::Sign),
        1 => Just(Op::Fail),
        2 => (1i64..400).prop_map(Op::Advance),
    ]
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
}

fn record(at: DateTime<Utc>) -> SignatureRecord {
    SignatureRecord::new(Rut::new("12345678-5").unwrap(), "prop-sig", at)
}

proptest! {
    /// Whatever the operation order, a session only ever reaches
    /// `signed` if the immediately preceding persisted state was
    /// `scanned`, and terminal states never change again.
    #[test]
    fn transitions_never_skip_scan_and_terminals_absorb(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let store = SessionStore::new();
        let document = DocumentId::new();
        let ttl = Duration::minutes(5);
        let mut now = t0();
        let mut current_code = None;

        for op in ops {
            // Snapshot the state the operation will see.
            let before = current_code
                .as_ref()
                .and_then(|code| store.status(document, code, now).ok());
            let replaces_session = matches!(op, Op::Create);

            match op {
                Op::Create => {
                    let session = store.create(document, ttl, now);
                    current_code = Some(session.verification_code);
                }
                Op::Scan => {
                    if let Some(code) = &current_code {
                        let result = store.confirm_scan(document, code, now);
                        let before = before.as_ref().expect("session exists");
                        match before.status {
                            SessionStatus::Waiting | SessionStatus::Scanned => {
                                prop_assert!(result.is_ok());
                            }
                            _ => prop_assert!(result.is_err()),
                        }
                    }
                }
                Op::Sign => {
                    if let Some(code) = &current_code {
                        let result = store.submit_signature(document, code, record(now), now);
                        let before = before.as_ref().expect("session exists");
                        // The core handshake property: signing succeeds
                        // only from scanned.
                        if before.status == SessionStatus::Scanned {
                            prop_assert!(result.is_ok());
                        } else {
                            prop_assert!(result.is_err());
                        }
                    }
                }
                Op::Fail => {
                    if let Some(code) = &current_code {
                        let result = store.fail(document, code, "prop failure", now);
                        let before = before.as_ref().expect("session exists");
                        if before.status.is_terminal() {
                            prop_assert!(result.is_err());
                        } else {
                            prop_assert!(result.is_ok());
                        }
                    }
                }
                Op::Advance(secs) => {
                    now += Duration::seconds(secs);
                }
            }

            // Terminal states are absorbing: once observed terminal, the
            // stored status never changes again. (After a Create the
            // snapshot refers to the superseded session, so skip it.)
            if let (false, Some(code), Some(before)) = (replaces_session, &current_code, &before) {
                if before.status.is_terminal() {
                    let after = store.status(document, code, now).unwrap();
                    prop_assert_eq!(after.status, before.status);
                }
            }

            // At most one active session per document, always.
            prop_assert!(store.active_len() <= 1);
        }
    }

    /// Expiry is permanent: after the TTL elapses every read reports
    /// `expired` regardless of how much more time passes.
    #[test]
    fn expiry_is_monotonic(advances in proptest::collection::vec(1i64..600, 1..20)) {
        let store = SessionStore::new();
        let document = DocumentId::new();
        let session = store.create(document, Duration::seconds(30), t0());
        let code = session.verification_code;

        let mut now = t0() + Duration::seconds(31);
        let first = store.status(document, &code, now).unwrap();
        prop_assert_eq!(first.status, SessionStatus::Expired);

        for secs in advances {
            now += Duration::seconds(secs);
            let read = store.status(document, &code, now).unwrap();
            prop_assert_eq!(read.status, SessionStatus::Expired);
            prop_assert!(store.confirm_scan(document, &code, now).is_err());
            prop_assert!(store.submit_signature(document, &code, record(now), now).is_err());
        }
    }
}
