//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the Firma Stack.
//! Each identifier is a distinct type — you cannot pass a [`DocumentId`]
//! where a [`VerificationCode`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`VerificationCode`], [`Rut`]) validate format
//! at construction time. UUID-based identifiers ([`DocumentId`]) are always
//! valid by construction.
//!
//! - Verification code: 32 lowercase hex characters (16 random bytes) —
//!   the single-use token binding a mobile signing session to a document.
//! - RUT: Chilean rol único tributario, validated with its modulo-11
//!   check digit. Canonical storage strips dots and dash.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Helper macro to implement `Deserialize` for string newtypes that must
/// validate their contents. Deserializes as a plain `String`, then routes
/// through the type's `new()` constructor so that invalid values are
/// rejected at deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

/// A unique identifier for a document held in the document directory.
///
/// The signing subsystem treats documents as opaque references; resolution
/// to actual content lives with the directory collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random document identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a document identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// Single-use verification code binding a mobile signing session to a
/// specific document-signing request.
///
/// Canonical form is 32 lowercase hex characters — the hex encoding of
/// 16 bytes drawn from the OS CSPRNG. The constructor accepts uppercase
/// hex and normalizes it; anything that is not exactly 32 hex characters
/// is rejected.
///
/// Codes are never derived from the document or the clock, so holding one
/// session's code gives no purchase on guessing another's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VerificationCode(String);

impl_validating_deserialize!(VerificationCode);

impl VerificationCode {
    /// Number of random bytes backing a code (128 bits of entropy).
    pub const BYTE_LEN: usize = 16;

    /// Length of the canonical hex form.
    pub const HEX_LEN: usize = 2 * Self::BYTE_LEN;

    /// Create a verification code from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidVerificationCode`] if the string
    /// is not exactly 32 hex characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let lower = raw.to_lowercase();
        if lower.len() != Self::HEX_LEN || !lower.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidVerificationCode(raw));
        }
        Ok(Self(lower))
    }

    /// Create a code from raw bytes. Infallible — the hex encoding of
    /// [`Self::BYTE_LEN`] bytes is always canonical.
    pub fn from_bytes(bytes: [u8; Self::BYTE_LEN]) -> Self {
        let mut s = String::with_capacity(Self::HEX_LEN);
        for b in bytes {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
        }
        Self(s)
    }

    /// Access the canonical hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VerificationCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Chilean rol único tributario (RUT).
///
/// The canonical storage format is the number followed by the check digit,
/// uppercase, without dots or dash. The constructor accepts all common
/// renderings:
/// - `"12345678-5"` (dash only)
/// - `"12.345.678-5"` (formatted with thousands dots)
/// - `"123456785"` (bare)
///
/// # Validation
///
/// - Number part must be 1 to 8 digits.
/// - Check digit must be a digit or `K`, and must match the modulo-11
///   checksum of the number part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Rut(String);

impl_validating_deserialize!(Rut);

impl Rut {
    /// Create a RUT from a string value, validating format and check digit.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRut`] if the format is invalid or
    /// the check digit does not match.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let stripped: String = raw
            .chars()
            .filter(|c| *c != '.' && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if stripped.len() < 2 || stripped.len() > 9 {
            return Err(ValidationError::InvalidRut(raw));
        }

        let (number, check) = stripped.split_at(stripped.len() - 1);
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidRut(raw));
        }
        let check = check.chars().next().expect("split_at leaves one char");
        if !check.is_ascii_digit() && check != 'K' {
            return Err(ValidationError::InvalidRut(raw));
        }

        if Self::check_digit(number) != check {
            return Err(ValidationError::InvalidRut(raw));
        }

        Ok(Self(stripped))
    }

    /// Compute the modulo-11 check digit for a digit string.
    ///
    /// Digits are weighted 2,3,4,5,6,7 cycling from the right; the digit is
    /// `11 - (sum mod 11)`, with 11 rendered as `0` and 10 as `K`.
    fn check_digit(number: &str) -> char {
        let mut sum: u32 = 0;
        let mut weight: u32 = 2;
        for c in number.chars().rev() {
            let d = c.to_digit(10).expect("validated as digit");
            sum += d * weight;
            weight = if weight == 7 { 2 } else { weight + 1 };
        }
        match 11 - (sum % 11) {
            11 => '0',
            10 => 'K',
            n => char::from_digit(n, 10).expect("0..=9"),
        }
    }

    /// Access the RUT in canonical form (no dots, no dash, uppercase K).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the RUT formatted for display: `12.345.678-5`.
    pub fn formatted(&self) -> String {
        let (number, check) = self.0.split_at(self.0.len() - 1);
        let digits: Vec<char> = number.chars().collect();
        let mut grouped = String::new();
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(*c);
        }
        format!("{grouped}-{check}")
    }
}

impl std::fmt::Display for Rut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- DocumentId --

    #[test]
    fn document_id_unique() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn document_id_from_uuid_roundtrip() {
        let uuid = Uuid::new_v4();
        let id = DocumentId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn document_id_display_is_uuid() {
        let id = DocumentId::new();
        assert_eq!(format!("{id}").len(), 36);
    }

    #[test]
    fn document_id_parses_from_str() {
        let id = DocumentId::new();
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    // -- VerificationCode --

    #[test]
    fn code_valid_lowercase_hex() {
        let code = VerificationCode::new("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(code.as_str(), "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn code_uppercase_normalized() {
        let code = VerificationCode::new("0123456789ABCDEF0123456789ABCDEF").unwrap();
        assert_eq!(code.as_str(), "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn code_rejects_invalid() {
        assert!(VerificationCode::new("").is_err());
        assert!(VerificationCode::new("abc123").is_err()); // too short
        assert!(VerificationCode::new("0123456789abcdef0123456789abcde").is_err()); // 31 chars
        assert!(VerificationCode::new("0123456789abcdef0123456789abcdef0").is_err()); // 33 chars
        assert!(VerificationCode::new("g123456789abcdef0123456789abcdef").is_err()); // non-hex
    }

    #[test]
    fn code_from_bytes_is_canonical() {
        let code = VerificationCode::from_bytes([0xab; 16]);
        assert_eq!(code.as_str(), "abababababababababababababababab");
        assert_eq!(code.as_str().len(), VerificationCode::HEX_LEN);
        // Round-trips through the validating constructor.
        assert_eq!(VerificationCode::new(code.as_str()).unwrap(), code);
    }

    #[test]
    fn code_display_matches_as_str() {
        let code = VerificationCode::from_bytes([0x01; 16]);
        assert_eq!(format!("{code}"), code.as_str());
    }

    // -- Rut --

    #[test]
    fn rut_valid_with_dash() {
        let rut = Rut::new("12345678-5").unwrap();
        assert_eq!(rut.as_str(), "123456785");
    }

    #[test]
    fn rut_valid_with_dots() {
        let rut = Rut::new("12.345.678-5").unwrap();
        assert_eq!(rut.as_str(), "123456785");
    }

    #[test]
    fn rut_valid_bare() {
        let rut = Rut::new("123456785").unwrap();
        assert_eq!(rut.formatted(), "12.345.678-5");
    }

    #[test]
    fn rut_k_check_digit() {
        // 20.347.878 has check digit K under modulo 11.
        let rut = Rut::new("20347878-K").unwrap();
        assert_eq!(rut.as_str(), "20347878K");
        // Lowercase k is normalized.
        assert_eq!(Rut::new("20347878-k").unwrap(), rut);
    }

    #[test]
    fn rut_rejects_wrong_check_digit() {
        assert!(Rut::new("12345678-9").is_err());
        assert!(Rut::new("12.345.678-0").is_err());
    }

    #[test]
    fn rut_rejects_malformed() {
        assert!(Rut::new("").is_err());
        assert!(Rut::new("5").is_err()); // no number part
        assert!(Rut::new("abcdefgh-5").is_err()); // non-digit number
        assert!(Rut::new("123456789012-3").is_err()); // too long
    }

    #[test]
    fn rut_display_is_formatted() {
        let rut = Rut::new("7654321-6").unwrap();
        assert_eq!(format!("{rut}"), "7.654.321-6");
    }

    // -- Serde roundtrips --

    #[test]
    fn code_serde_roundtrip() {
        let code = VerificationCode::from_bytes([0x42; 16]);
        let json = serde_json::to_string(&code).unwrap();
        let parsed: VerificationCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, parsed);
    }

    #[test]
    fn code_deserialize_rejects_invalid() {
        let result: Result<VerificationCode, _> = serde_json::from_str("\"not-a-code\"");
        assert!(result.is_err());
    }

    #[test]
    fn rut_serde_roundtrip() {
        let rut = Rut::new("12.345.678-5").unwrap();
        let json = serde_json::to_string(&rut).unwrap();
        let parsed: Rut = serde_json::from_str(&json).unwrap();
        assert_eq!(rut, parsed);
    }

    #[test]
    fn rut_deserialize_rejects_bad_check_digit() {
        let result: Result<Rut, _> = serde_json::from_str("\"12345678-9\"");
        assert!(result.is_err());
    }

    #[test]
    fn document_id_serde_roundtrip() {
        let id = DocumentId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
