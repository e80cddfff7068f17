//! Durable patient registry on SQLite.
//!
//! Multiple records per patient key are allowed (no uniqueness constraint);
//! `find_by_key` resolves duplicates most-recent-first. The medical record
//! list is stored as a JSON array column and only ever appended to.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{
    ContentRef, PatientAttributes, PatientKey, PatientRecord, RecordId,
};
use crate::ports::{CreateOutcome, Registry, RegistryError};

use super::{is_unavailable, DEFAULT_BUSY_TIMEOUT};

/// SQLite-backed registry.
pub struct SqliteRegistry {
    conn: Mutex<Connection>,
}

impl SqliteRegistry {
    /// Open (or create) a registry at the given path with the default busy
    /// timeout.
    ///
    /// # Errors
    /// Returns `Unavailable` if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        Self::with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open with an explicit busy timeout.
    ///
    /// # Errors
    /// Returns `Unavailable` if the database cannot be opened or initialized.
    pub fn with_timeout<P: AsRef<Path>>(
        path: P,
        busy_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let conn = super::open(path, busy_timeout).map_err(map_err)?;
        let registry = Self {
            conn: Mutex::new(conn),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    /// Create an in-memory registry (for testing).
    ///
    /// # Errors
    /// Returns `Unavailable` if the database cannot be created.
    pub fn in_memory() -> Result<Self, RegistryError> {
        let conn = super::open_in_memory().map_err(map_err)?;
        let registry = Self {
            conn: Mutex::new(conn),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    fn init_schema(&self) -> Result<(), RegistryError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS patients (
                record_id TEXT PRIMARY KEY,
                patient_key TEXT NOT NULL,
                name TEXT NOT NULL,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                national_id TEXT NOT NULL,
                blood_type TEXT NOT NULL,
                allergies TEXT NOT NULL,
                emergency_contact TEXT NOT NULL,
                fingerprint_digest TEXT NOT NULL,
                medical_records TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_patients_key_created
                ON patients(patient_key, created_at DESC);
            ",
        )
        .map_err(map_err)?;

        Ok(())
    }
}

fn map_err(e: rusqlite::Error) -> RegistryError {
    // Only outage-class errors may trigger the fallback path upstream; a
    // statement the backend rejected (constraint violation, corrupt row)
    // would be rejected by the fallback store just the same.
    if is_unavailable(&e) {
        RegistryError::Unavailable(e.to_string())
    } else {
        RegistryError::Validation(format!("backend rejected statement: {e}"))
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRecord> {
    let key_hex: String = row.get("patient_key")?;
    let medical_json: String = row.get("medical_records")?;
    let created_at: String = row.get("created_at")?;

    let key = PatientKey::from_hex(&key_hex).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let medical_records: Vec<ContentRef> =
        serde_json::from_str(&medical_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&chrono::Utc);

    Ok(PatientRecord {
        record_id: RecordId::new(row.get::<_, String>("record_id")?),
        key,
        attributes: PatientAttributes {
            name: row.get("name")?,
            age: row.get("age")?,
            gender: row.get("gender")?,
            national_id: row.get("national_id")?,
            blood_type: row.get("blood_type")?,
            allergies: row.get("allergies")?,
            emergency_contact: row.get("emergency_contact")?,
        },
        fingerprint_digest: ContentRef::new(row.get::<_, String>("fingerprint_digest")?),
        medical_records,
        created_at,
    })
}

impl Registry for SqliteRegistry {
    fn create(&self, record: &PatientRecord) -> Result<CreateOutcome, RegistryError> {
        crate::ports::validate_record(record)?;

        let medical_json = serde_json::to_string(&record.medical_records)
            .map_err(|e| RegistryError::Validation(e.to_string()))?;

        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            r"INSERT INTO patients (
                record_id, patient_key, name, age, gender, national_id,
                blood_type, allergies, emergency_contact, fingerprint_digest,
                medical_records, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.record_id.as_str(),
                record.key.as_hex(),
                record.attributes.name,
                record.attributes.age,
                record.attributes.gender,
                record.attributes.national_id,
                record.attributes.blood_type,
                record.attributes.allergies,
                record.attributes.emergency_contact,
                record.fingerprint_digest.as_str(),
                medical_json,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(map_err)?;

        Ok(CreateOutcome {
            record_id: record.record_id.clone(),
            degraded: false,
        })
    }

    fn find_by_key(&self, key: &PatientKey) -> Result<PatientRecord, RegistryError> {
        let conn = self.conn.lock().expect("Lock failed");
        let record = conn
            .query_row(
                r"SELECT * FROM patients
                  WHERE patient_key = ?1
                  ORDER BY created_at DESC, rowid DESC
                  LIMIT 1",
                params![key.as_hex()],
                row_to_record,
            )
            .optional()
            .map_err(map_err)?;

        record.ok_or(RegistryError::NotFound(*key))
    }

    fn find_all_by_key(&self, key: &PatientKey) -> Result<Vec<PatientRecord>, RegistryError> {
        let conn = self.conn.lock().expect("Lock failed");
        let mut stmt = conn
            .prepare(
                r"SELECT * FROM patients
                  WHERE patient_key = ?1
                  ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(map_err)?;
        let rows = stmt
            .query_map(params![key.as_hex()], row_to_record)
            .map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn append_content_ref(&self, key: &PatientKey, r: &ContentRef) -> Result<(), RegistryError> {
        // Read-modify-write of the JSON list; the connection mutex makes it
        // atomic within this process, and duplicates are resolved by reads
        // anyway.
        let conn = self.conn.lock().expect("Lock failed");
        let newest: Option<(String, String)> = conn
            .query_row(
                r"SELECT record_id, medical_records FROM patients
                  WHERE patient_key = ?1
                  ORDER BY created_at DESC, rowid DESC
                  LIMIT 1",
                params![key.as_hex()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(map_err)?;

        let (record_id, medical_json) = newest.ok_or(RegistryError::NotFound(*key))?;
        let mut refs: Vec<ContentRef> = serde_json::from_str(&medical_json)
            .map_err(|e| RegistryError::Unavailable(format!("corrupt medical list: {e}")))?;
        refs.push(r.clone());
        let updated = serde_json::to_string(&refs)
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        conn.execute(
            "UPDATE patients SET medical_records = ?1 WHERE record_id = ?2",
            params![updated, record_id],
        )
        .map_err(map_err)?;
        Ok(())
    }

    fn delete(&self, record_id: &RecordId) -> Result<(), RegistryError> {
        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            "DELETE FROM patients WHERE record_id = ?1",
            params![record_id.as_str()],
        )
        .map_err(map_err)?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<PatientRecord>, RegistryError> {
        let conn = self.conn.lock().expect("Lock failed");
        let mut stmt = conn
            .prepare("SELECT * FROM patients ORDER BY created_at DESC, rowid DESC")
            .map_err(map_err)?;
        let rows = stmt.query_map([], row_to_record).map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FingerprintTemplate;

    fn record(template: &[u8], name: &str) -> PatientRecord {
        let key = PatientKey::from_template(&FingerprintTemplate::from_bytes(template.to_vec()));
        PatientRecord::new(
            key,
            PatientAttributes {
                name: name.to_string(),
                age: 41,
                gender: "M".to_string(),
                national_id: "9999-0000-1111".to_string(),
                blood_type: "B+".to_string(),
                allergies: "Penicillin".to_string(),
                emergency_contact: "Ann (Sister): 555-0102".to_string(),
            },
            ContentRef::new("fp-digest"),
            vec![ContentRef::new("scan-1")],
        )
    }

    #[test]
    fn test_create_and_find_round_trip() {
        let registry = SqliteRegistry::in_memory().expect("Should create db");
        let rec = record(b"t1", "Ravi");
        registry.create(&rec).expect("Should create");

        let found = registry.find_by_key(&rec.key).expect("Should find");
        assert_eq!(found.record_id, rec.record_id);
        assert_eq!(found.attributes, rec.attributes);
        assert_eq!(found.medical_records, rec.medical_records);
        assert_eq!(found.fingerprint_digest, rec.fingerprint_digest);
    }

    #[test]
    fn test_create_rejects_empty_attributes() {
        let registry = SqliteRegistry::in_memory().expect("Should create db");
        let mut rec = record(b"t1", "Ravi");
        rec.attributes.blood_type = String::new();

        assert!(matches!(
            registry.create(&rec),
            Err(RegistryError::Validation(_))
        ));
        // Validation failures never reach the database.
        assert!(registry.list_all().expect("Should list").is_empty());
    }

    #[test]
    fn test_rejected_statement_is_not_unavailable() {
        let registry = SqliteRegistry::in_memory().expect("Should create db");
        let rec = record(b"t1", "Ravi");
        registry.create(&rec).expect("Should create");

        // Re-inserting the same record_id violates the primary key. That is
        // a rejection, not an outage, and must not trigger fallback
        // degradation upstream.
        assert!(matches!(
            registry.create(&rec),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicates_resolve_most_recent_first() {
        let registry = SqliteRegistry::in_memory().expect("Should create db");
        let mut older = record(b"same", "Older");
        let mut newer = record(b"same", "Newer");
        older.created_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        newer.created_at = chrono::Utc::now();
        registry.create(&older).expect("Should create");
        registry.create(&newer).expect("Should create");

        assert_eq!(
            registry
                .find_by_key(&older.key)
                .expect("Should find")
                .attributes
                .name,
            "Newer"
        );
        let all = registry.find_all_by_key(&older.key).expect("Should list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].attributes.name, "Newer");
    }

    #[test]
    fn test_append_preserves_prior_entries() {
        let registry = SqliteRegistry::in_memory().expect("Should create db");
        let rec = record(b"t1", "Ravi");
        registry.create(&rec).expect("Should create");
        registry
            .append_content_ref(&rec.key, &ContentRef::new("scan-2"))
            .expect("Should append");

        let found = registry.find_by_key(&rec.key).expect("Should find");
        assert_eq!(
            found.medical_records,
            vec![ContentRef::new("scan-1"), ContentRef::new("scan-2")]
        );
    }

    #[test]
    fn test_delete_removes_only_target() {
        let registry = SqliteRegistry::in_memory().expect("Should create db");
        let a = record(b"a", "A");
        let b = record(b"b", "B");
        registry.create(&a).expect("Should create");
        registry.create(&b).expect("Should create");

        registry.delete(&a.record_id).expect("Should delete");
        assert!(matches!(
            registry.find_by_key(&a.key),
            Err(RegistryError::NotFound(_))
        ));
        assert!(registry.find_by_key(&b.key).is_ok());
    }
}
