//! Registration service: Orchestrates the two core patient operations.
//!
//! `register` coordinates:
//! - Attribute validation (fail fast, before any external call)
//! - Content-store puts for the fingerprint template and medical blobs
//! - Identity resolution via the matcher capability
//! - Registry write (durable or degraded fallback)
//! - Best-effort audit ledger appends
//!
//! The three backends are independent calls with no distributed transaction:
//! a failure after a put leaves orphaned but harmless blobs (content
//! addressing makes them cheap to ignore), and a ledger failure after a
//! registry write delays the audit trail without losing patient data.
//! Registration never succeeds without a registry write; it can succeed
//! with ledger appends pending.

use std::sync::Arc;

use crate::domain::{
    BlobMetadata, ContentRef, FingerprintTemplate, MedicalBlob, PatientAttributes, PatientKey,
    PatientRecord, RecordId,
};
use crate::ports::{AuditLedger, ContentStore, Matcher, Registry, RegistryError};
use crate::{HealthchainError, Result};

use super::retry::RetryPolicy;
use super::scoped_file::ScopedBlobFile;

/// Successful registration: the resolved identity plus what was stored.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Canonical identity derived from the submitted template
    pub key: PatientKey,

    /// Registry identifier of the created record
    pub record_id: RecordId,

    /// True when the record went to the in-process fallback store
    pub degraded: bool,

    /// Content ref of the stored fingerprint template
    pub fingerprint_digest: ContentRef,

    /// Content refs of the stored medical artifacts, in upload order
    pub medical_refs: Vec<ContentRef>,

    /// Echo of the attributes as stored
    pub attributes: PatientAttributes,
}

/// A patient record together with its audit trail.
#[derive(Debug, Clone)]
pub struct PatientHistory {
    pub record: PatientRecord,
    pub events: Vec<crate::domain::AccessEvent>,
}

/// Service for registering and matching patients.
pub struct RegistrationService<C, R, L, M>
where
    C: ContentStore,
    R: Registry,
    L: AuditLedger,
    M: Matcher,
{
    content: Arc<C>,
    registry: Arc<R>,
    ledger: Arc<L>,
    matcher: Arc<M>,
    retry: RetryPolicy,
}

impl<C, R, L, M> RegistrationService<C, R, L, M>
where
    C: ContentStore,
    R: Registry,
    L: AuditLedger,
    M: Matcher,
{
    /// Create a new registration service with the default retry policy.
    pub fn new(content: Arc<C>, registry: Arc<R>, ledger: Arc<L>, matcher: Arc<M>) -> Self {
        Self {
            content,
            registry,
            ledger,
            matcher,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy for content-store and ledger calls.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Register a patient: validate, store blobs, resolve identity, write
    /// the record, then append upload events best-effort.
    ///
    /// # Errors
    /// `Validation` if an attribute is missing, `ContentStore` if a put
    /// fails after the retry bound, `Registry` if the record cannot be
    /// written to either the durable or fallback store. Ledger failures are
    /// logged, not surfaced.
    pub fn register(
        &self,
        attributes: PatientAttributes,
        template: &FingerprintTemplate,
        blobs: Vec<MedicalBlob>,
    ) -> Result<Registration> {
        // Step 1: fail fast before any external call.
        attributes
            .validate()
            .map_err(|errors| HealthchainError::Validation(errors.join("; ")))?;
        if template.is_empty() {
            return Err(HealthchainError::Validation(
                "Fingerprint template is required".to_string(),
            ));
        }

        tracing::info!(blob_count = blobs.len(), "Starting patient registration");

        // Step 2: store the fingerprint template.
        let fp_meta = BlobMetadata::named("fingerprint-template")
            .with("type", "fingerprint-template")
            .with("uploadedAt", chrono::Utc::now().to_rfc3339());
        let fingerprint_digest = self.put_with_retry(template.as_bytes(), &fp_meta)?;

        // Step 3: store each medical blob.
        let mut medical_refs = Vec::with_capacity(blobs.len());
        for blob in &blobs {
            let meta = BlobMetadata::named(&blob.category)
                .with("type", "medical-record")
                .with("category", blob.category.clone())
                .with("description", blob.description.clone())
                .with("uploadedAt", chrono::Utc::now().to_rfc3339());
            medical_refs.push(self.put_with_retry(&blob.bytes, &meta)?);
        }

        // Step 4: the digest of the template is the identity.
        let key = self.matcher.resolve(template);

        // Step 5: write the record. A degraded outcome is success.
        let record = PatientRecord::new(
            key,
            attributes.clone(),
            fingerprint_digest.clone(),
            medical_refs.clone(),
        );
        let outcome = self.registry.create(&record)?;
        if outcome.degraded {
            tracing::warn!(
                record_id = %outcome.record_id,
                "Patient record written to fallback store; durable registry is down"
            );
        }

        // Step 6: audit the uploads. Best-effort; the record is already
        // durable and is never rolled back over a missing audit event.
        self.append_upload_best_effort(&key, &fingerprint_digest);
        for r in &medical_refs {
            self.append_upload_best_effort(&key, r);
        }

        tracing::info!(record_id = %outcome.record_id, degraded = outcome.degraded, "Patient registered");

        Ok(Registration {
            key,
            record_id: outcome.record_id,
            degraded: outcome.degraded,
            fingerprint_digest,
            medical_refs,
            attributes,
        })
    }

    /// Match a fingerprint template to its registered patient.
    ///
    /// Appends an access event best-effort on a hit; a ledger outage never
    /// blocks returning the record. A miss performs no ledger write.
    ///
    /// # Errors
    /// `NotFound` if no record exists for the resolved key.
    pub fn match_patient(
        &self,
        template: &FingerprintTemplate,
        actor_id: &str,
    ) -> Result<PatientRecord> {
        let key = self.matcher.resolve(template);
        self.match_by_digest(&key, actor_id)
    }

    /// Match by a pre-computed patient key (digest), for ingress layers that
    /// already hold one.
    ///
    /// # Errors
    /// `NotFound` if no record exists for the key.
    pub fn match_by_digest(&self, key: &PatientKey, actor_id: &str) -> Result<PatientRecord> {
        let record = self.registry.find_by_key(key).map_err(map_find_err)?;

        let append = self.retry.run(
            "ledger.append_access",
            |e: &crate::ports::LedgerError| e.is_retryable(),
            || self.ledger.append_access(key, actor_id),
        );
        match append {
            Ok(tx) => tracing::debug!(tx_id = %tx, "Access recorded"),
            // Monitoring concern, not a correctness violation: the record is
            // returned, only its audit trail is delayed.
            Err(e) => tracing::warn!(error = %e, "Failed to record access event"),
        }

        Ok(record)
    }

    /// A patient's record together with its full audit trail.
    ///
    /// Read-only view; does not itself append an access event.
    ///
    /// # Errors
    /// `NotFound` if no record exists; `Ledger` if the ledger cannot be
    /// read.
    pub fn patient_history(&self, key: &PatientKey) -> Result<PatientHistory> {
        let record = self.registry.find_by_key(key).map_err(map_find_err)?;
        let events = self.ledger.list_events(key)?;
        Ok(PatientHistory { record, events })
    }

    /// Fetch a stored artifact.
    ///
    /// # Errors
    /// `ContentStore` if the ref is unknown.
    pub fn fetch_artifact(&self, r: &ContentRef) -> Result<Vec<u8>> {
        Ok(self.content.get(r)?)
    }

    /// Store a blob staged as a temporary local file, for ingress layers
    /// that land uploads on disk before handing them over. Ownership of the
    /// path transfers here: the file is removed when this returns, success
    /// and failure alike.
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `ContentStore` if the put fails
    /// after the retry bound. The file is removed in every case.
    pub fn put_file(
        &self,
        path: impl Into<std::path::PathBuf>,
        meta: &BlobMetadata,
    ) -> Result<ContentRef> {
        let file = ScopedBlobFile::new(path);
        let bytes = file.read()?;
        self.put_with_retry(&bytes, meta)
    }

    fn put_with_retry(&self, blob: &[u8], meta: &BlobMetadata) -> Result<ContentRef> {
        let r = self.retry.run(
            "content_store.put",
            |e: &crate::ports::ContentStoreError| e.is_retryable(),
            || self.content.put(blob, meta),
        )?;
        Ok(r)
    }

    fn append_upload_best_effort(&self, key: &PatientKey, r: &ContentRef) {
        let append = self.retry.run(
            "ledger.append_upload",
            |e: &crate::ports::LedgerError| e.is_retryable(),
            || self.ledger.append_upload(key, r),
        );
        if let Err(e) = append {
            tracing::warn!(content_ref = %r, error = %e, "Failed to record upload event");
        }
    }
}

fn map_find_err(e: RegistryError) -> HealthchainError {
    match e {
        RegistryError::NotFound(key) => {
            HealthchainError::NotFound(format!("No matching patient for key {key}"))
        }
        other => HealthchainError::Registry(other),
    }
}
