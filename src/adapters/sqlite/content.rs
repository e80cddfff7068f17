//! Content-addressed blob store on SQLite.
//!
//! The content ref is the hex SHA-256 digest of the blob, computed before
//! the insert, so a duplicate put of identical bytes hits the existing row
//! and returns the identical ref. Metadata is stored as opaque JSON and
//! never interpreted.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::domain::{BlobMetadata, ContentRef};
use crate::ports::{ContentStore, ContentStoreError};

use super::DEFAULT_BUSY_TIMEOUT;

/// SQLite-backed content store.
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
}

impl SqliteContentStore {
    /// Open (or create) a blob store at the given path with the default
    /// busy timeout.
    ///
    /// # Errors
    /// Returns `Upload` if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ContentStoreError> {
        Self::with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open with an explicit busy timeout.
    ///
    /// # Errors
    /// Returns `Upload` if the database cannot be opened or initialized.
    pub fn with_timeout<P: AsRef<Path>>(
        path: P,
        busy_timeout: Duration,
    ) -> Result<Self, ContentStoreError> {
        let conn = super::open(path, busy_timeout)
            .map_err(|e| ContentStoreError::Upload(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory blob store (for testing).
    ///
    /// # Errors
    /// Returns `Upload` if the database cannot be created.
    pub fn in_memory() -> Result<Self, ContentStoreError> {
        let conn =
            super::open_in_memory().map_err(|e| ContentStoreError::Upload(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), ContentStoreError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS blobs (
                digest TEXT PRIMARY KEY,
                content BLOB NOT NULL,
                name TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| ContentStoreError::Upload(e.to_string()))?;

        Ok(())
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

impl ContentStore for SqliteContentStore {
    fn put(&self, blob: &[u8], metadata: &BlobMetadata) -> Result<ContentRef, ContentStoreError> {
        let r = Self::address_of(blob);
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| ContentStoreError::Upload(e.to_string()))?;

        let conn = self.conn.lock().expect("Lock failed");
        // OR IGNORE keeps the first stored copy: equal digest means equal
        // content, so a duplicate put is a successful no-op.
        conn.execute(
            r"INSERT OR IGNORE INTO blobs (digest, content, name, metadata, created_at)
              VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                r.as_str(),
                blob,
                metadata.name,
                metadata_json,
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| ContentStoreError::Upload(e.to_string()))?;

        Ok(r)
    }

    fn get(&self, r: &ContentRef) -> Result<Vec<u8>, ContentStoreError> {
        let conn = self.conn.lock().expect("Lock failed");
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT content FROM blobs WHERE digest = ?1",
                params![r.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ContentStoreError::Upload(e.to_string()))?;

        blob.ok_or_else(|| ContentStoreError::NotFound(r.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryContentStore;

    #[test]
    fn test_put_is_idempotent() {
        let store = SqliteContentStore::in_memory().expect("Should create db");
        let meta = BlobMetadata::named("xray.png").with("type", "medical-record");
        let r1 = store.put(b"image bytes", &meta).expect("Should put");
        let r2 = store.put(b"image bytes", &meta).expect("Should put again");
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_round_trip() {
        let store = SqliteContentStore::in_memory().expect("Should create db");
        let blob = vec![0u8, 1, 2, 3, 255];
        let r = store
            .put(&blob, &BlobMetadata::named("blob"))
            .expect("Should put");
        assert_eq!(store.get(&r).expect("Should get"), blob);
    }

    #[test]
    fn test_different_content_different_ref() {
        let store = SqliteContentStore::in_memory().expect("Should create db");
        let meta = BlobMetadata::named("f");
        let r1 = store.put(b"one", &meta).expect("Should put");
        let r2 = store.put(b"two", &meta).expect("Should put");
        assert_ne!(r1, r2);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = SqliteContentStore::in_memory().expect("Should create db");
        let err = store
            .get(&ContentRef::new("no-such-digest"))
            .expect_err("Should miss");
        assert!(matches!(err, ContentStoreError::NotFound(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_address_agrees_with_memory_adapter() {
        // Both backends must assign the same ref to the same content, or a
        // registry entry written against one store would dangle in the other.
        assert_eq!(
            SqliteContentStore::address_of(b"shared bytes"),
            MemoryContentStore::address_of(b"shared bytes")
        );
    }
}
