//! # firma-core — Foundational Types for the Firma Stack
//!
//! Domain-primitive newtypes and shared error types used by every other
//! crate in the workspace. Nothing here performs I/O.
//!
//! ## Contents
//!
//! - [`identity`] — validated identifier newtypes: [`DocumentId`],
//!   [`VerificationCode`], and the Chilean [`Rut`].
//! - [`error`] — structured validation errors.
//!
//! ## Crate Policy
//!
//! - Sits at the bottom of the dependency DAG — depends on no other
//!   workspace crate.
//! - Identifiers validate their format at construction time; an invalid
//!   value is unrepresentable once past the constructor.
//! - Timestamps are `chrono::DateTime<Utc>` everywhere; local-time values
//!   never enter the system.

pub mod error;
pub mod identity;

pub use error::ValidationError;
pub use identity::{DocumentId, Rut, VerificationCode};
