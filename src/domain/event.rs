//! Audit event types.
//!
//! Events are produced only by the ledger client and are immutable once
//! appended. Ordering is the ledger's insertion order (`seq`), not wall-clock
//! time; `recorded_at` is informational.

use serde::{Deserialize, Serialize};

use super::{ContentRef, PatientKey};

/// Opaque confirmation handle returned by the ledger backend after a durable
/// append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    /// Wrap a backend confirmation handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The handle string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A medical artifact was stored for the patient
    Upload,
    /// The patient's record was accessed
    Access,
}

impl EventKind {
    /// Stable string form used by ledger backends.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Access => "access",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(Self::Upload),
            "access" => Some(Self::Access),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only audit ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Ledger insertion order, unique per backend
    pub seq: u64,

    /// Canonical patient identity the event belongs to
    pub patient_key: PatientKey,

    /// Who performed the action (uploader or accessor)
    pub actor_id: String,

    /// Stored artifact, present for `Upload` events
    pub content_ref: Option<ContentRef>,

    /// Upload or access
    pub kind: EventKind,

    /// When the backend recorded the event (informational; ordering is `seq`)
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}
