//! # Verification-Code Generation & Signing URLs
//!
//! Codes are 16 bytes from the OS CSPRNG, hex encoded — never derived
//! from the document, the clock, or a counter, so observing one code
//! gives no purchase on guessing another.
//!
//! The signing URL embeds the document and the code; the mobile page
//! mounted at `/firma-movil/` resolves both against the session store.

use firma_core::{DocumentId, VerificationCode};
use rand_core::{OsRng, RngCore};

/// Path segment of the mobile signing page.
const SIGNING_PATH: &str = "firma-movil";

/// Generate a fresh verification code from the OS CSPRNG.
pub fn generate_code() -> VerificationCode {
    let mut bytes = [0u8; VerificationCode::BYTE_LEN];
    OsRng.fill_bytes(&mut bytes);
    VerificationCode::from_bytes(bytes)
}

/// Build the fully-qualified signing URL a QR code encodes.
///
/// `base_url` is the externally reachable origin of the service (for
/// example `https://firma.cerfidoc.cl`); a trailing slash is tolerated.
pub fn signing_url(base_url: &str, document_id: DocumentId, code: &VerificationCode) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/{SIGNING_PATH}/{document_id}/{code}")
}
