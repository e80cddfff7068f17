//! Append-only audit ledger on SQLite.
//!
//! Rows are only ever inserted; `seq` (the rowid) is the ledger ordering.
//! The `TxId` confirmation handle is minted only after the insert commits,
//! giving callers the explicit confirmation-wait semantics of a
//! transaction-oriented backend: when `append_*` returns, the event is
//! durable.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection};

use crate::domain::ids::uuid_v4;
use crate::domain::{AccessEvent, ContentRef, EventKind, PatientKey, TxId};
use crate::ports::{AuditLedger, LedgerError};

use super::{is_unavailable, DEFAULT_BUSY_TIMEOUT};

/// SQLite-backed audit ledger.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    signer: String,
}

impl SqliteLedger {
    /// Open (or create) a ledger at the given path with the default busy
    /// timeout.
    ///
    /// # Errors
    /// Returns `Unavailable` if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        Self::with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open with an explicit busy timeout.
    ///
    /// # Errors
    /// Returns `Unavailable` if the database cannot be opened or initialized.
    pub fn with_timeout<P: AsRef<Path>>(
        path: P,
        busy_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let conn = super::open(path, busy_timeout).map_err(map_err)?;
        let ledger = Self {
            conn: Mutex::new(conn),
            signer: "system".to_string(),
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    /// Create an in-memory ledger (for testing).
    ///
    /// # Errors
    /// Returns `Unavailable` if the database cannot be created.
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn = super::open_in_memory().map_err(map_err)?;
        let ledger = Self {
            conn: Mutex::new(conn),
            signer: "system".to_string(),
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    /// Set the signer identity recorded as the actor of upload events.
    #[must_use]
    pub fn with_signer(mut self, signer: impl Into<String>) -> Self {
        self.signer = signer.into();
        self
    }

    fn init_schema(&self) -> Result<(), LedgerError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS audit_events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                tx_id TEXT NOT NULL,
                patient_key TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                content_ref TEXT,
                kind TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_events_key
                ON audit_events(patient_key, seq);
            ",
        )
        .map_err(map_err)?;

        Ok(())
    }

    fn append(
        &self,
        key: &PatientKey,
        actor_id: &str,
        content_ref: Option<&ContentRef>,
        kind: EventKind,
    ) -> Result<TxId, LedgerError> {
        if actor_id.trim().is_empty() {
            return Err(LedgerError::Rejected("empty actor id".to_string()));
        }

        let tx_id = TxId::new(uuid_v4());
        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            r"INSERT INTO audit_events (tx_id, patient_key, actor_id, content_ref, kind, recorded_at)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tx_id.as_str(),
                key.as_hex(),
                actor_id,
                content_ref.map(ContentRef::as_str),
                kind.as_str(),
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .map_err(map_err)?;

        // The insert has committed; only now is the confirmation handle
        // handed back.
        Ok(tx_id)
    }
}

fn map_err(e: rusqlite::Error) -> LedgerError {
    if is_unavailable(&e) {
        LedgerError::Unavailable(e.to_string())
    } else {
        LedgerError::Rejected(e.to_string())
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccessEvent> {
    let key_hex: String = row.get("patient_key")?;
    let kind_str: String = row.get("kind")?;
    let recorded_at: String = row.get("recorded_at")?;

    let patient_key = PatientKey::from_hex(&key_hex).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let kind = EventKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown event kind {kind_str:?}").into(),
        )
    })?;
    let recorded_at = chrono::DateTime::parse_from_rfc3339(&recorded_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&chrono::Utc);

    Ok(AccessEvent {
        seq: row.get::<_, i64>("seq")? as u64,
        patient_key,
        actor_id: row.get("actor_id")?,
        content_ref: row
            .get::<_, Option<String>>("content_ref")?
            .map(ContentRef::new),
        kind,
        recorded_at,
    })
}

impl AuditLedger for SqliteLedger {
    fn append_upload(&self, key: &PatientKey, r: &ContentRef) -> Result<TxId, LedgerError> {
        let signer = self.signer.clone();
        self.append(key, &signer, Some(r), EventKind::Upload)
    }

    fn append_access(&self, key: &PatientKey, actor_id: &str) -> Result<TxId, LedgerError> {
        self.append(key, actor_id, None, EventKind::Access)
    }

    fn list_events(&self, key: &PatientKey) -> Result<Vec<AccessEvent>, LedgerError> {
        let conn = self.conn.lock().expect("Lock failed");
        let mut stmt = conn
            .prepare(
                r"SELECT seq, tx_id, patient_key, actor_id, content_ref, kind, recorded_at
                  FROM audit_events
                  WHERE patient_key = ?1
                  ORDER BY seq",
            )
            .map_err(map_err)?;
        let rows = stmt
            .query_map(params![key.as_hex()], row_to_event)
            .map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }
}
