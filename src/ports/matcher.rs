//! Matcher port: Trait for resolving identity from a fingerprint template.
//!
//! The orchestrator depends on this capability, not on a concrete algorithm.
//! The shipped implementation is exact-digest matching; a future
//! similarity-based matcher can replace it behind the same seam without
//! touching the orchestrator.

use crate::domain::{FingerprintTemplate, PatientKey};

/// Trait for deriving the canonical patient key from a template.
pub trait Matcher: Send + Sync {
    /// Resolve a template to its patient key. Pure; no I/O.
    fn resolve(&self, template: &FingerprintTemplate) -> PatientKey;
}

/// Exact-digest matcher: the SHA-256 digest of the raw template bytes is the
/// key.
///
/// Known limitation: any variation in how the sensor captures the same
/// physical finger (noise, rotation, partial print) produces a different
/// digest and is treated as a different patient. Callers must supply
/// bit-identical template bytes for a match to succeed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactDigestMatcher;

impl Matcher for ExactDigestMatcher {
    fn resolve(&self, template: &FingerprintTemplate) -> PatientKey {
        PatientKey::from_template(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_matches_direct_derivation() {
        let template = FingerprintTemplate::from_bytes(vec![7; 64]);
        let matcher = ExactDigestMatcher;
        assert_eq!(matcher.resolve(&template), PatientKey::from_template(&template));
    }

    #[test]
    fn test_resolve_is_stable_across_calls() {
        let template = FingerprintTemplate::from_bytes(b"capture".to_vec());
        let matcher = ExactDigestMatcher;
        assert_eq!(matcher.resolve(&template), matcher.resolve(&template));
    }
}
