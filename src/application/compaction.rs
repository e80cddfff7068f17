//! Compaction service: offline deduplication of patient records.
//!
//! Concurrent registrations with the same template are both allowed to
//! succeed, so a key can accumulate duplicate records. Reads already
//! resolve this most-recent-first; this sweep makes it physical by deleting
//! the older copies. It is maintenance, not hot path: nothing in `register`
//! or `match` waits on it, and running it is always safe because the kept
//! record is the one reads were returning anyway.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::PatientKey;
use crate::ports::{Registry, RegistryError};

/// Outcome of one compaction sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Distinct patient keys examined
    pub keys_scanned: usize,

    /// Older duplicate records deleted
    pub records_deleted: usize,
}

/// Service for the keep-newest duplicate sweep.
pub struct CompactionService<R: Registry> {
    registry: Arc<R>,
}

impl<R: Registry> CompactionService<R> {
    /// Create a compaction service over a registry.
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Sweep every key in the registry, keeping only the newest record per
    /// key.
    ///
    /// # Errors
    /// Returns `RegistryError` if the registry cannot be read or a delete
    /// fails; records already deleted stay deleted (the sweep is
    /// re-runnable).
    pub fn compact_all(&self) -> Result<CompactionReport, RegistryError> {
        let records = self.registry.list_all()?;
        let mut by_key: HashMap<PatientKey, usize> = HashMap::new();
        for record in &records {
            *by_key.entry(record.key).or_insert(0) += 1;
        }

        let mut report = CompactionReport {
            keys_scanned: by_key.len(),
            records_deleted: 0,
        };
        for (key, count) in by_key {
            if count > 1 {
                report.records_deleted += self.compact_key(&key)?;
            }
        }

        tracing::info!(
            keys_scanned = report.keys_scanned,
            records_deleted = report.records_deleted,
            "Compaction sweep complete"
        );
        Ok(report)
    }

    /// Deduplicate one key: keep the most recently created record, delete
    /// the rest. Returns the number of records deleted.
    ///
    /// # Errors
    /// Returns `RegistryError` if the registry cannot be read or a delete
    /// fails.
    pub fn compact_key(&self, key: &PatientKey) -> Result<usize, RegistryError> {
        // Most recent first; everything after the head is an older duplicate.
        let records = self.registry.find_all_by_key(key)?;
        let mut deleted = 0;
        for stale in records.iter().skip(1) {
            self.registry.delete(&stale.record_id)?;
            deleted += 1;
        }
        if deleted > 0 {
            tracing::info!(%key, deleted, "Deleted duplicate patient records");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryRegistry;
    use crate::domain::{ContentRef, FingerprintTemplate, PatientAttributes, PatientRecord};

    fn record(template: &[u8], name: &str, age_seconds: i64) -> PatientRecord {
        let key = PatientKey::from_template(&FingerprintTemplate::from_bytes(template.to_vec()));
        let mut rec = PatientRecord::new(
            key,
            PatientAttributes {
                name: name.to_string(),
                age: 52,
                gender: "M".to_string(),
                national_id: "7777-8888-9999".to_string(),
                blood_type: "O-".to_string(),
                allergies: "None".to_string(),
                emergency_contact: "Lee (Friend): 555-0104".to_string(),
            },
            ContentRef::new("fp"),
            vec![],
        );
        rec.created_at = chrono::Utc::now() - chrono::Duration::seconds(age_seconds);
        rec
    }

    #[test]
    fn test_keeps_newest_deletes_older() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.create(&record(b"dup", "Oldest", 30)).expect("create");
        registry.create(&record(b"dup", "Middle", 20)).expect("create");
        registry.create(&record(b"dup", "Newest", 0)).expect("create");
        registry.create(&record(b"solo", "Solo", 0)).expect("create");

        let service = CompactionService::new(Arc::clone(&registry));
        let report = service.compact_all().expect("Should compact");
        assert_eq!(report.keys_scanned, 2);
        assert_eq!(report.records_deleted, 2);

        let dup_key =
            PatientKey::from_template(&FingerprintTemplate::from_bytes(b"dup".to_vec()));
        let remaining = registry.find_all_by_key(&dup_key).expect("Should list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].attributes.name, "Newest");
    }

    #[test]
    fn test_no_duplicates_is_noop() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.create(&record(b"a", "A", 0)).expect("create");

        let service = CompactionService::new(Arc::clone(&registry));
        let report = service.compact_all().expect("Should compact");
        assert_eq!(report.records_deleted, 0);
        assert_eq!(registry.list_all().expect("Should list").len(), 1);
    }

    #[test]
    fn test_compact_single_key_only() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.create(&record(b"dup", "Old", 10)).expect("create");
        registry.create(&record(b"dup", "New", 0)).expect("create");
        registry.create(&record(b"other", "Old2", 10)).expect("create");
        registry.create(&record(b"other", "New2", 0)).expect("create");

        let dup_key =
            PatientKey::from_template(&FingerprintTemplate::from_bytes(b"dup".to_vec()));
        let service = CompactionService::new(Arc::clone(&registry));
        assert_eq!(service.compact_key(&dup_key).expect("Should compact"), 1);

        // The other key is untouched.
        let other_key =
            PatientKey::from_template(&FingerprintTemplate::from_bytes(b"other".to_vec()));
        assert_eq!(
            registry.find_all_by_key(&other_key).expect("Should list").len(),
            2
        );
    }
}
