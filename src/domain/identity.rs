//! Biometric identity types.
//!
//! A fingerprint template is opaque sensor output; it is never parsed, only
//! digested. The SHA-256 digest of the raw template bytes is the canonical
//! patient key used across the registry and the audit ledger.
//!
//! # Memory Security
//!
//! `FingerprintTemplate` implements `Zeroize` and `ZeroizeOnDrop` so raw
//! biometric material is securely erased when no longer needed, and its
//! `Debug` implementation does NOT expose template bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Raw fingerprint template bytes from a biometric sensor.
///
/// Treated as opaque identity material: the bytes are digested, never
/// interpreted. Matching is exact-digest equality, so callers must supply
/// bit-identical bytes for two captures to resolve to the same patient.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FingerprintTemplate {
    inner: Vec<u8>,
}

impl FingerprintTemplate {
    /// Wrap raw sensor bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { inner: bytes }
    }

    /// Get the raw template bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Template size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the capture is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// Intentionally NOT exposing template bytes to prevent accidental leakage.
impl std::fmt::Debug for FingerprintTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintTemplate")
            .field("size_bytes", &self.inner.len())
            .finish()
    }
}

/// Error returned when parsing a hex-encoded patient key fails.
#[derive(Debug, thiserror::Error)]
#[error("Invalid patient key: expected 64 lowercase hex characters, got {0:?}")]
pub struct KeyParseError(pub String);

/// Canonical patient identity: SHA-256 digest of the raw template bytes.
///
/// Deterministic (same template bytes always yield the same key) and used as
/// the record key in both the registry and the ledger. Serialized as
/// lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientKey([u8; 32]);

impl PatientKey {
    /// Derive the key from a fingerprint template.
    ///
    /// Pure and collision-resistant; no I/O.
    #[must_use]
    pub fn from_template(template: &FingerprintTemplate) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(template.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Get the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as lowercase hex (the ledger/registry record key).
    #[must_use]
    pub fn as_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a lowercase hex key back into its digest form.
    ///
    /// # Errors
    /// Returns `KeyParseError` if the input is not 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, KeyParseError> {
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KeyParseError(s.to_string()));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = (chunk[0] as char).to_digit(16).ok_or_else(|| KeyParseError(s.to_string()))?;
            let lo = (chunk[1] as char).to_digit(16).ok_or_else(|| KeyParseError(s.to_string()))?;
            out[i] = ((hi << 4) | lo) as u8;
        }
        Ok(Self(out))
    }
}

impl std::fmt::Display for PatientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl std::fmt::Debug for PatientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PatientKey({})", self.as_hex())
    }
}

impl std::str::FromStr for PatientKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for PatientKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_hex())
    }
}

impl<'de> Deserialize<'de> for PatientKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let t1 = FingerprintTemplate::from_bytes(vec![1, 2, 3, 4]);
        let t2 = FingerprintTemplate::from_bytes(vec![1, 2, 3, 4]);
        assert_eq!(PatientKey::from_template(&t1), PatientKey::from_template(&t2));
    }

    #[test]
    fn test_different_bytes_different_key() {
        let t1 = FingerprintTemplate::from_bytes(vec![1, 2, 3, 4]);
        let t2 = FingerprintTemplate::from_bytes(vec![1, 2, 3, 5]);
        assert_ne!(PatientKey::from_template(&t1), PatientKey::from_template(&t2));
    }

    #[test]
    fn test_hex_round_trip() {
        let key = PatientKey::from_template(&FingerprintTemplate::from_bytes(vec![9; 16]));
        let hex = key.as_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(PatientKey::from_hex(&hex).expect("Should parse"), key);
    }

    #[test]
    fn test_hex_rejects_malformed() {
        assert!(PatientKey::from_hex("deadbeef").is_err());
        assert!(PatientKey::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_template_debug_no_leak() {
        let template = FingerprintTemplate::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let debug_output = format!("{template:?}");
        assert!(!debug_output.contains("222")); // 0xde = 222
        assert!(debug_output.contains("size_bytes"));
    }
}
