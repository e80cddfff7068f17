//! Patient record types.
//!
//! A record is created once at registration and is otherwise append-only:
//! new content refs may be added to `medical_records`, prior entries are
//! never rewritten or removed. The registry keeps a best-effort single
//! active record per key; duplicates arising from concurrent registrations
//! are tolerated and resolved by most-recent-wins reads plus an offline
//! compaction sweep.

use serde::{Deserialize, Serialize};

use super::ids::uuid_v4;
use super::{ContentRef, PatientKey};

/// Registry-assigned identifier for one stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid_v4())
    }

    /// The identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Required demographic and clinical attributes captured at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PatientAttributes {
    /// Full name
    pub name: String,

    /// Age in years (must be positive)
    pub age: u32,

    /// Self-reported gender
    pub gender: String,

    /// Government identity number (e.g. Aadhaar)
    pub national_id: String,

    /// Blood type (e.g. "O+")
    pub blood_type: String,

    /// Known allergies, or an explicit "None"
    pub allergies: String,

    /// Composed contact string: "Name (Relation): Number"
    pub emergency_contact: String,
}

impl PatientAttributes {
    /// Validate that every required attribute is present.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings, one per missing
    /// field, so callers can report all problems at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let required = [
            ("name", &self.name),
            ("gender", &self.gender),
            ("national_id", &self.national_id),
            ("blood_type", &self.blood_type),
            ("allergies", &self.allergies),
            ("emergency_contact", &self.emergency_contact),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(format!("Missing required field: {field}"));
            }
        }
        if self.age == 0 {
            errors.push("Age must be a positive number".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Compose the emergency contact string the way the upload ingress
    /// collects it: separate name / relation / number fields.
    #[must_use]
    pub fn compose_emergency_contact(name: &str, relation: &str, number: &str) -> String {
        format!("{name} ({relation}): {number}")
    }
}

/// One patient registration: attributes plus content references.
///
/// `fingerprint_digest` references the stored template blob, never the raw
/// template bytes. `medical_records` is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Registry-assigned identifier
    pub record_id: RecordId,

    /// Canonical identity derived from the fingerprint template
    pub key: PatientKey,

    /// Required attributes, validated at creation
    pub attributes: PatientAttributes,

    /// Content ref of the stored fingerprint template blob
    pub fingerprint_digest: ContentRef,

    /// Content refs of stored medical artifacts, in upload order
    pub medical_records: Vec<ContentRef>,

    /// Creation timestamp; the most-recent-wins tie-break key for duplicate
    /// records under one patient key
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PatientRecord {
    /// Create a new record with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(
        key: PatientKey,
        attributes: PatientAttributes,
        fingerprint_digest: ContentRef,
        medical_records: Vec<ContentRef>,
    ) -> Self {
        Self {
            record_id: RecordId::generate(),
            key,
            attributes,
            fingerprint_digest,
            medical_records,
            created_at: chrono::Utc::now(),
        }
    }
}
