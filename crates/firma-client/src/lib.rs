//! # firma-client — Desktop Client for the Signing API
//!
//! Typed HTTP client and status poller for the QR remote-signing
//! handshake, used by the desktop application and the operator CLI.
//!
//! ## Poller Contract
//!
//! The desktop side observes progress exclusively by polling the status
//! endpoint — there is no server push. [`poller::poll_until_terminal`]
//! implements the required client behavior:
//!
//! - poll at a bounded interval (default 3 seconds),
//! - stop on any terminal status (`signed`, `expired`, `error`),
//! - stop when wall-clock wait exceeds the session TTL plus a grace
//!   period, even if the server never reports a terminal status.
//!
//! Only transport failures and `UNAVAILABLE` responses are retried;
//! every other error is surfaced immediately so the operator can act
//! (typically by generating a fresh code).
//!
//! Cancellation is dropping the future: the poller holds no connection
//! between requests and leaves no server-side state behind.

pub mod client;
pub mod error;
pub mod poller;
mod retry;

pub use client::{ClientConfig, CreatedSession, RegisteredDocument, SessionState, SignOutcome, SigningClient};
pub use error::ClientError;
pub use poller::{poll_until_terminal, PollConfig, PollOutcome};
