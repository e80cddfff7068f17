//! In-memory adapters: process-lifetime implementations of the ports.
//!
//! `MemoryRegistry` is the fallback store used when the durable registry is
//! unreachable. It lives only as long as the process and is lost on restart;
//! it is an availability measure, NOT a backing store of record. All shared
//! state sits behind a single `Mutex`; callers never touch it directly.
//!
//! The content store and ledger variants back the test suites and small
//! single-process deployments.
//!
//! # Mutex Behavior
//!
//! A poisoned mutex (from panic in another thread) will cause panic. This
//! fail-fast behavior is intentional for data integrity in healthcare
//! applications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::domain::{
    AccessEvent, BlobMetadata, ContentRef, EventKind, PatientKey, PatientRecord, RecordId, TxId,
};
use crate::domain::ids::uuid_v4;
use crate::ports::{
    AuditLedger, ContentStore, ContentStoreError, CreateOutcome, LedgerError, Registry,
    RegistryError,
};

/// In-process keyed record store.
pub struct MemoryRegistry {
    records: Mutex<Vec<PatientRecord>>,
    // Fault injection for outage simulation in tests.
    unavailable: AtomicBool,
}

impl MemoryRegistry {
    /// Create an empty in-memory registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate backend unavailability: while set, every call fails with
    /// `RegistryError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable(
                "simulated outage".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for MemoryRegistry {
    fn create(&self, record: &PatientRecord) -> Result<CreateOutcome, RegistryError> {
        self.check_available()?;
        crate::ports::validate_record(record)?;

        let mut records = self.records.lock().expect("Lock failed");
        records.push(record.clone());
        Ok(CreateOutcome {
            record_id: record.record_id.clone(),
            degraded: false,
        })
    }

    fn find_by_key(&self, key: &PatientKey) -> Result<PatientRecord, RegistryError> {
        self.check_available()?;
        let records = self.records.lock().expect("Lock failed");
        records
            .iter()
            .filter(|r| &r.key == key)
            .max_by_key(|r| r.created_at)
            .cloned()
            .ok_or(RegistryError::NotFound(*key))
    }

    fn find_all_by_key(&self, key: &PatientKey) -> Result<Vec<PatientRecord>, RegistryError> {
        self.check_available()?;
        let records = self.records.lock().expect("Lock failed");
        let mut matches: Vec<PatientRecord> =
            records.iter().filter(|r| &r.key == key).cloned().collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    fn append_content_ref(&self, key: &PatientKey, r: &ContentRef) -> Result<(), RegistryError> {
        self.check_available()?;
        let mut records = self.records.lock().expect("Lock failed");
        let newest = records
            .iter_mut()
            .filter(|rec| &rec.key == key)
            .max_by_key(|rec| rec.created_at)
            .ok_or(RegistryError::NotFound(*key))?;
        newest.medical_records.push(r.clone());
        Ok(())
    }

    fn delete(&self, record_id: &RecordId) -> Result<(), RegistryError> {
        self.check_available()?;
        let mut records = self.records.lock().expect("Lock failed");
        records.retain(|r| &r.record_id != record_id);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<PatientRecord>, RegistryError> {
        self.check_available()?;
        Ok(self.records.lock().expect("Lock failed").clone())
    }
}

/// In-memory content-addressed blob store.
///
/// The ref is the hex SHA-256 digest of the content, so identical bytes map
/// to the identical ref and duplicate puts are no-ops.
pub struct MemoryContentStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryContentStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate backend failure: while set, `put` fails with `Upload`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Derive the content address for a blob.
    #[must_use]
    pub fn address_of(blob: &[u8]) -> ContentRef {
        let mut hasher = Sha256::new();
        hasher.update(blob);
        let digest = hasher.finalize();
        ContentRef::new(digest.iter().map(|b| format!("{b:02x}")).collect::<String>())
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for MemoryContentStore {
    fn put(&self, blob: &[u8], _metadata: &BlobMetadata) -> Result<ContentRef, ContentStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ContentStoreError::Upload("simulated outage".to_string()));
        }
        let r = Self::address_of(blob);
        let mut blobs = self.blobs.lock().expect("Lock failed");
        blobs.entry(r.as_str().to_string()).or_insert_with(|| blob.to_vec());
        Ok(r)
    }

    fn get(&self, r: &ContentRef) -> Result<Vec<u8>, ContentStoreError> {
        let blobs = self.blobs.lock().expect("Lock failed");
        blobs
            .get(r.as_str())
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(r.clone()))
    }
}

/// In-memory append-only ledger.
pub struct MemoryLedger {
    events: Mutex<Vec<AccessEvent>>,
    next_seq: AtomicU64,
    signer: String,
    unavailable: AtomicBool,
}

impl MemoryLedger {
    /// Create an empty in-memory ledger with the default signer identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(1),
            signer: "system".to_string(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Set the signer identity recorded as the actor of upload events.
    #[must_use]
    pub fn with_signer(mut self, signer: impl Into<String>) -> Self {
        self.signer = signer.into();
        self
    }

    /// Simulate backend unavailability: while set, appends fail with
    /// `LedgerError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Total number of events across all patients.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.lock().expect("Lock failed").len()
    }

    fn append(
        &self,
        key: &PatientKey,
        actor_id: &str,
        content_ref: Option<ContentRef>,
        kind: EventKind,
    ) -> Result<TxId, LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("simulated outage".to_string()));
        }
        if actor_id.trim().is_empty() {
            return Err(LedgerError::Rejected("empty actor id".to_string()));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let event = AccessEvent {
            seq,
            patient_key: *key,
            actor_id: actor_id.to_string(),
            content_ref,
            kind,
            recorded_at: chrono::Utc::now(),
        };
        self.events.lock().expect("Lock failed").push(event);
        Ok(TxId::new(uuid_v4()))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLedger for MemoryLedger {
    fn append_upload(&self, key: &PatientKey, r: &ContentRef) -> Result<TxId, LedgerError> {
        let signer = self.signer.clone();
        self.append(key, &signer, Some(r.clone()), EventKind::Upload)
    }

    fn append_access(&self, key: &PatientKey, actor_id: &str) -> Result<TxId, LedgerError> {
        self.append(key, actor_id, None, EventKind::Access)
    }

    fn list_events(&self, key: &PatientKey) -> Result<Vec<AccessEvent>, LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("simulated outage".to_string()));
        }
        let events = self.events.lock().expect("Lock failed");
        let mut matches: Vec<AccessEvent> = events
            .iter()
            .filter(|e| &e.patient_key == key)
            .cloned()
            .collect();
        matches.sort_by_key(|e| e.seq);
        Ok(matches)
    }
}
