//! Ledger port: Trait for the append-only audit ledger.
//!
//! Every append blocks until the backend confirms durability; the returned
//! `TxId` is minted only after confirmation. Callers that need low latency
//! must treat appends as background work and must not assume success before
//! confirmation.

use crate::domain::{AccessEvent, ContentRef, PatientKey, TxId};

/// Error type for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Backend unreachable or timed out. Retryable with bounded backoff.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the append (e.g. malformed key). Fatal for this
    /// call; never retried.
    #[error("Ledger rejected append: {0}")]
    Rejected(String),
}

impl LedgerError {
    /// Whether the caller may retry the failed append.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Trait for the tamper-evident, append-only audit ledger.
///
/// Nothing is ever deleted; events are immutable once appended and ordered
/// by the ledger's insertion order.
pub trait AuditLedger: Send + Sync {
    /// Record that an artifact was stored for the patient. Blocks until the
    /// backend confirms durability.
    ///
    /// # Errors
    /// `Unavailable` (retryable) or `Rejected` (fatal).
    fn append_upload(&self, key: &PatientKey, r: &ContentRef) -> Result<TxId, LedgerError>;

    /// Record that the patient's record was accessed by `actor_id`. Blocks
    /// until the backend confirms durability.
    ///
    /// # Errors
    /// `Unavailable` (retryable) or `Rejected` (fatal).
    fn append_access(&self, key: &PatientKey, actor_id: &str) -> Result<TxId, LedgerError>;

    /// Read back all events for a patient, ordered by insertion.
    ///
    /// Finite and restartable: re-querying returns a fresh snapshot, not a
    /// live stream.
    ///
    /// # Errors
    /// Returns `Unavailable` if the backend cannot be reached.
    fn list_events(&self, key: &PatientKey) -> Result<Vec<AccessEvent>, LedgerError>;
}
