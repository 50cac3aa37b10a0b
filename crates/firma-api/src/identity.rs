//! # Identity Verification Seam
//!
//! The signature step only completes after the signer's identity proof
//! passes verification. Production deployments plug the biometric/NFC
//! provider in behind [`IdentityVerifier`]; this crate ships
//! [`MockVerifier`], a structural stand-in for development and tests.
//! The session state machine and timing contracts are unaffected by
//! which implementation is in force.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use firma_core::Rut;

/// The proof material a signer submits with the signature step.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SignerIdentityProof {
    /// The signer's RUT, in any common rendering ("12.345.678-5").
    pub rut: String,
    /// Opaque evidence token from the identity capture flow on the
    /// signer's device (biometric match token, NFC chip read, etc.).
    pub evidence: String,
}

/// A verified signer reference, recorded into the signature record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSigner {
    /// The signer's validated RUT.
    pub rut: Rut,
    /// Which verification method accepted the proof.
    pub method: &'static str,
}

/// Identity verification failures.
///
/// `Malformed` is user-correctable: the session stays `scanned` and the
/// signer may resubmit. `Rejected` is a hard failure from the verifying
/// authority: the handler moves the session to `error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The proof is structurally invalid (bad RUT, missing evidence).
    #[error("malformed identity proof: {0}")]
    Malformed(String),

    /// The verifying authority rejected the proof.
    #[error("identity rejected: {0}")]
    Rejected(String),
}

/// Verifies a signer's identity proof.
///
/// Implementations must be cheap to call from request handlers; anything
/// that talks to an external service should carry its own timeout.
pub trait IdentityVerifier: Send + Sync {
    /// Validate the proof, returning the verified signer on success.
    fn verify(&self, proof: &SignerIdentityProof) -> Result<VerifiedSigner, IdentityError>;
}

/// Development verifier: validates the RUT's check digit and requires a
/// non-empty evidence token, accepting everything else.
///
/// Stands in for the production biometric/NFC provider behind the same
/// contract. Evidence tokens shorter than [`MockVerifier::MIN_EVIDENCE_LEN`]
/// are rejected outright, mimicking a provider that refuses truncated
/// capture payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockVerifier;

impl MockVerifier {
    /// Minimum accepted evidence token length.
    pub const MIN_EVIDENCE_LEN: usize = 8;
}

impl IdentityVerifier for MockVerifier {
    fn verify(&self, proof: &SignerIdentityProof) -> Result<VerifiedSigner, IdentityError> {
        let rut = Rut::new(&proof.rut).map_err(|e| IdentityError::Malformed(e.to_string()))?;

        let evidence = proof.evidence.trim();
        if evidence.is_empty() {
            return Err(IdentityError::Malformed("evidence token is empty".into()));
        }
        if evidence.len() < Self::MIN_EVIDENCE_LEN {
            return Err(IdentityError::Rejected(
                "evidence token rejected by verifier".into(),
            ));
        }

        Ok(VerifiedSigner {
            rut,
            method: "mock",
        })
    }
}
