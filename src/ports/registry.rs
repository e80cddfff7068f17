//! Registry port: Trait for the keyed patient record store.
//!
//! The durable backend allows multiple records per key (no uniqueness
//! constraint); concurrent registrations with the same template can both
//! succeed. Reads resolve duplicates most-recent-first, and an offline
//! compaction sweep deletes the older copies.

use crate::domain::{ContentRef, PatientKey, PatientRecord, RecordId};

/// Error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A required attribute is missing or malformed. Caller's fault; never
    /// retried.
    #[error("Invalid record: {0}")]
    Validation(String),

    /// No record stored under the key.
    #[error("No record for patient key {0}")]
    NotFound(PatientKey),

    /// Durable backend unreachable or timed out. Non-fatal on create: a
    /// fallback store absorbs the write and flags degraded mode.
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// Result of a create, carrying the degraded-mode signal.
///
/// `degraded` is true when the durable backend was unreachable and the
/// record went to the in-process fallback instead. The write succeeded
/// either way; degraded mode is an operational signal, not a failure.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub record_id: RecordId,
    pub degraded: bool,
}

/// Trait for the keyed patient record store.
pub trait Registry: Send + Sync {
    /// Store a new record. Validates required attributes first.
    ///
    /// # Errors
    /// `Validation` if an attribute is empty; `Unavailable` if the backend
    /// cannot be reached (wrap in a fallback registry to absorb this).
    fn create(&self, record: &PatientRecord) -> Result<CreateOutcome, RegistryError>;

    /// Find the record for a key. When duplicates exist, returns the most
    /// recently created one (defined tie-break, not an error).
    ///
    /// # Errors
    /// `NotFound` if no record exists; `Unavailable` errors are always
    /// surfaced, never guessed around.
    fn find_by_key(&self, key: &PatientKey) -> Result<PatientRecord, RegistryError>;

    /// All records under a key, most recent first. Used by compaction.
    ///
    /// # Errors
    /// Returns `Unavailable` if the backend cannot be reached.
    fn find_all_by_key(&self, key: &PatientKey) -> Result<Vec<PatientRecord>, RegistryError>;

    /// Append a content ref to the record's medical list without rewriting
    /// prior entries.
    ///
    /// # Errors
    /// `NotFound` if no record exists for the key.
    fn append_content_ref(&self, key: &PatientKey, r: &ContentRef) -> Result<(), RegistryError>;

    /// Delete one record by id. Compaction-only; patient data is otherwise
    /// append-only.
    ///
    /// # Errors
    /// Returns `Unavailable` if the backend cannot be reached.
    fn delete(&self, record_id: &RecordId) -> Result<(), RegistryError>;

    /// All stored records. Maintenance surface for operators.
    ///
    /// # Errors
    /// Returns `Unavailable` if the backend cannot be reached.
    fn list_all(&self) -> Result<Vec<PatientRecord>, RegistryError>;
}

/// Validate a record before any backend write.
pub(crate) fn validate_record(record: &PatientRecord) -> Result<(), RegistryError> {
    record
        .attributes
        .validate()
        .map_err(|errors| RegistryError::Validation(errors.join("; ")))
}
