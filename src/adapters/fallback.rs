//! Fallback registry: durable primary with an in-process degraded mode.
//!
//! Clinical workflows must not be blocked by infrastructure outages, so a
//! `create` that hits an unreachable durable backend is absorbed into an
//! in-memory store and flagged as degraded rather than failed. The fallback
//! holds records only for the lifetime of the process; it is lost on
//! restart and is NOT a backing store of record. Operators must treat a
//! raised degraded flag as an outage to resolve, not a steady state.
//!
//! Reads merge both stores: the most recently created record wins no
//! matter which side holds it, so a duplicate registered during an outage
//! stays authoritative after the primary recovers. If neither side has the
//! record, the primary's error is surfaced as-is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{ContentRef, PatientKey, PatientRecord, RecordId};
use crate::ports::{CreateOutcome, Registry, RegistryError};

use super::memory::MemoryRegistry;

/// Registry wrapper that degrades to an in-process store on outage.
pub struct FallbackRegistry<P: Registry> {
    primary: Arc<P>,
    fallback: MemoryRegistry,
    degraded: AtomicBool,
}

impl<P: Registry> FallbackRegistry<P> {
    /// Wrap a durable primary registry.
    pub fn new(primary: Arc<P>) -> Self {
        Self {
            primary,
            fallback: MemoryRegistry::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether any write has degraded to the in-process store since startup.
    ///
    /// Sticky: stays true once raised, because fallback-held records remain
    /// invisible to the durable backend until operators reconcile them.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Records currently held only in the fallback store. Reconciliation
    /// surface for operators after an outage.
    ///
    /// # Errors
    /// Propagates fallback store errors (none in practice).
    pub fn fallback_records(&self) -> Result<Vec<PatientRecord>, RegistryError> {
        self.fallback.list_all()
    }
}

impl<P: Registry> Registry for FallbackRegistry<P> {
    fn create(&self, record: &PatientRecord) -> Result<CreateOutcome, RegistryError> {
        match self.primary.create(record) {
            Ok(outcome) => Ok(outcome),
            Err(RegistryError::Unavailable(reason)) => {
                tracing::warn!(
                    record_id = %record.record_id,
                    %reason,
                    "Durable registry unavailable, degrading create to in-process fallback"
                );
                let outcome = self.fallback.create(record)?;
                self.degraded.store(true, Ordering::SeqCst);
                Ok(CreateOutcome {
                    record_id: outcome.record_id,
                    degraded: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn find_by_key(&self, key: &PatientKey) -> Result<PatientRecord, RegistryError> {
        // Most-recent-wins must hold across BOTH stores: a duplicate
        // registered during an outage lives only in the fallback and may be
        // newer than what the primary answers with.
        match self.primary.find_by_key(key) {
            Ok(primary_hit) => match self.fallback.find_by_key(key) {
                Ok(fallback_hit) if fallback_hit.created_at > primary_hit.created_at => {
                    Ok(fallback_hit)
                }
                _ => Ok(primary_hit),
            },
            Err(primary_err @ (RegistryError::NotFound(_) | RegistryError::Unavailable(_))) => {
                match self.fallback.find_by_key(key) {
                    Ok(record) => Ok(record),
                    Err(_) => Err(primary_err),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn find_all_by_key(&self, key: &PatientKey) -> Result<Vec<PatientRecord>, RegistryError> {
        let mut records = self.primary.find_all_by_key(key)?;
        records.extend(self.fallback.find_all_by_key(key)?);
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn append_content_ref(&self, key: &PatientKey, r: &ContentRef) -> Result<(), RegistryError> {
        // Same merged view as `find_by_key`: the append must land on the
        // record reads resolve to, even when that record lives only in the
        // fallback.
        match self.primary.find_by_key(key) {
            Ok(primary_hit) => {
                if let Ok(fallback_hit) = self.fallback.find_by_key(key) {
                    if fallback_hit.created_at > primary_hit.created_at {
                        return self.fallback.append_content_ref(key, r);
                    }
                }
                self.primary.append_content_ref(key, r)
            }
            Err(primary_err @ (RegistryError::NotFound(_) | RegistryError::Unavailable(_))) => {
                self.fallback
                    .append_content_ref(key, r)
                    .map_err(|_| primary_err)
            }
            Err(e) => Err(e),
        }
    }

    fn delete(&self, record_id: &RecordId) -> Result<(), RegistryError> {
        // Both sides: a compacted duplicate may live in either store.
        let primary_result = self.primary.delete(record_id);
        let _ = self.fallback.delete(record_id);
        primary_result
    }

    fn list_all(&self) -> Result<Vec<PatientRecord>, RegistryError> {
        let mut records = self.primary.list_all()?;
        records.extend(self.fallback.list_all()?);
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FingerprintTemplate, PatientAttributes};

    fn record(template: &[u8], name: &str) -> PatientRecord {
        let key = PatientKey::from_template(&FingerprintTemplate::from_bytes(template.to_vec()));
        PatientRecord::new(
            key,
            PatientAttributes {
                name: name.to_string(),
                age: 28,
                gender: "F".to_string(),
                national_id: "4444-5555-6666".to_string(),
                blood_type: "AB+".to_string(),
                allergies: "None".to_string(),
                emergency_contact: "Kim (Parent): 555-0103".to_string(),
            },
            ContentRef::new("fp-digest"),
            vec![],
        )
    }

    #[test]
    fn test_healthy_primary_not_degraded() {
        let primary = Arc::new(MemoryRegistry::new());
        let registry = FallbackRegistry::new(primary);
        let rec = record(b"t1", "Asha");

        let outcome = registry.create(&rec).expect("Should create");
        assert!(!outcome.degraded);
        assert!(!registry.is_degraded());
        assert!(registry.fallback_records().expect("Should list").is_empty());
    }

    #[test]
    fn test_outage_degrades_and_stays_readable() {
        let primary = Arc::new(MemoryRegistry::new());
        let registry = FallbackRegistry::new(Arc::clone(&primary));
        primary.set_unavailable(true);

        let rec = record(b"t1", "Asha");
        let outcome = registry.create(&rec).expect("Should degrade, not fail");
        assert!(outcome.degraded);
        assert!(registry.is_degraded());

        // Still unreachable primary: read comes from the fallback.
        let found = registry.find_by_key(&rec.key).expect("Should find");
        assert_eq!(found.record_id, rec.record_id);

        // Primary recovers but never saw the record; the fallback still
        // serves it for the rest of the process lifetime.
        primary.set_unavailable(false);
        assert!(registry.find_by_key(&rec.key).is_ok());
        assert_eq!(registry.fallback_records().expect("Should list").len(), 1);
    }

    #[test]
    fn test_validation_errors_are_not_absorbed() {
        let primary = Arc::new(MemoryRegistry::new());
        let registry = FallbackRegistry::new(primary);
        let mut rec = record(b"t1", "Asha");
        rec.attributes.name = String::new();

        assert!(matches!(
            registry.create(&rec),
            Err(RegistryError::Validation(_))
        ));
        assert!(!registry.is_degraded());
    }

    #[test]
    fn test_miss_on_both_sides_surfaces_primary_error() {
        let primary = Arc::new(MemoryRegistry::new());
        let registry = FallbackRegistry::new(primary);
        let key = PatientKey::from_template(&FingerprintTemplate::from_bytes(b"none".to_vec()));

        assert!(matches!(
            registry.find_by_key(&key),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_newer_fallback_duplicate_wins_after_recovery() {
        let primary = Arc::new(MemoryRegistry::new());
        let registry = FallbackRegistry::new(Arc::clone(&primary));

        let mut older = record(b"same", "Older");
        older.created_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        registry.create(&older).expect("Should create");

        primary.set_unavailable(true);
        let newer = record(b"same", "Newer");
        registry.create(&newer).expect("Should degrade");
        primary.set_unavailable(false);

        // The recovered primary answers for the key, but the duplicate
        // written during the outage is newer and must win.
        let found = registry.find_by_key(&older.key).expect("Should find");
        assert_eq!(found.attributes.name, "Newer");
        assert_eq!(found.record_id, newer.record_id);

        // Appends land on that same record, not the primary's older one.
        registry
            .append_content_ref(&older.key, &ContentRef::new("late-scan"))
            .expect("Should append");
        let found = registry.find_by_key(&older.key).expect("Should find");
        assert_eq!(found.record_id, newer.record_id);
        assert_eq!(found.medical_records, vec![ContentRef::new("late-scan")]);
        assert!(registry
            .primary
            .find_by_key(&older.key)
            .expect("Should find")
            .medical_records
            .is_empty());
    }

    #[test]
    fn test_newer_primary_record_wins_over_fallback() {
        let primary = Arc::new(MemoryRegistry::new());
        let registry = FallbackRegistry::new(Arc::clone(&primary));

        primary.set_unavailable(true);
        let mut stale = record(b"same", "Stale");
        stale.created_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        registry.create(&stale).expect("Should degrade");
        primary.set_unavailable(false);

        let fresh = record(b"same", "Fresh");
        registry.create(&fresh).expect("Should create");

        let found = registry.find_by_key(&fresh.key).expect("Should find");
        assert_eq!(found.record_id, fresh.record_id);

        registry
            .append_content_ref(&fresh.key, &ContentRef::new("scan"))
            .expect("Should append");
        assert_eq!(
            registry
                .primary
                .find_by_key(&fresh.key)
                .expect("Should find")
                .medical_records,
            vec![ContentRef::new("scan")]
        );
    }

    #[test]
    fn test_append_reaches_fallback_record() {
        let primary = Arc::new(MemoryRegistry::new());
        let registry = FallbackRegistry::new(Arc::clone(&primary));
        primary.set_unavailable(true);

        let rec = record(b"t1", "Asha");
        registry.create(&rec).expect("Should degrade");
        registry
            .append_content_ref(&rec.key, &ContentRef::new("late-scan"))
            .expect("Should append via fallback");

        let found = registry.find_by_key(&rec.key).expect("Should find");
        assert_eq!(found.medical_records, vec![ContentRef::new("late-scan")]);
    }
}
