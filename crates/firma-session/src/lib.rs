//! # firma-session — Remote-Signing Session Lifecycle
//!
//! The state machine and store behind the QR-relayed remote-signing
//! handshake: a desktop operator opens a session for a document, the
//! signer's mobile device confirms the scan and submits the signature,
//! and the desktop observes progress by polling.
//!
//! ## State Machine
//!
//! ```text
//! waiting ──confirm_scan──▶ scanned ──submit_signature──▶ signed
//!    │                         │
//!    │ TTL elapsed             │ TTL elapsed
//!    ▼                         ▼
//! expired ◀──────────────── expired
//! ```
//!
//! `error` is reachable from any non-terminal state when an unrecoverable
//! failure occurs (for example the identity check hard-rejects the signer).
//! `signed`, `expired`, and `error` are terminal: no transition leaves them.
//!
//! A signature can never skip the scan step — `submit_signature` on a
//! `waiting` session is rejected. This is the core correctness property of
//! the handshake: a stale QR render cannot be silently "signed" by a
//! replayed call.
//!
//! ## Expiry
//!
//! Expiry is enforced lazily: every read and every write first compares
//! the clock against `expires_at` and flips an overdue session to
//! `expired` before doing anything else. A storage-hygiene sweep exists
//! ([`SessionStore::sweep_expired`]) but correctness never depends on it.
//!
//! ## Concurrency
//!
//! All transitions are conditional writes executed under the store's
//! single write lock: two racing `confirm_scan` calls observe exactly one
//! `waiting → scanned` transition, and a `submit_signature` racing ahead
//! of `confirm_scan` is rejected deterministically.

pub mod code;
pub mod error;
pub mod session;
pub mod store;

pub use code::{generate_code, signing_url};
pub use error::SessionError;
pub use session::{SessionStatus, SignatureRecord, SigningSession};
pub use store::SessionStore;
