//! SQLite adapters: durable implementations of the ports.
//!
//! One database file can host all three concerns (registry, blob store,
//! ledger) or each can point at its own file; schemas are initialized on
//! open and do not collide.
//!
//! Every constructor takes a busy timeout: a connection that cannot acquire
//! the database within the bound surfaces as the port's `Unavailable`-class
//! error instead of hanging, which is what triggers registry fallback and
//! ledger retry upstream.
//!
//! # Mutex Behavior
//!
//! Database connections are protected by `Mutex`. A poisoned mutex (from
//! panic in another thread) will cause panic. This fail-fast behavior is
//! intentional for data integrity in healthcare applications.

mod content;
mod ledger;
mod registry;

pub use content::SqliteContentStore;
pub use ledger::SqliteLedger;
pub use registry::SqliteRegistry;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

/// Default bound on waiting for a locked database.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection with the busy timeout applied.
fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

/// Open an in-memory connection (for testing).
fn open_in_memory() -> Result<Connection, rusqlite::Error> {
    Connection::open_in_memory()
}

/// Whether a database error means the backend is unreachable/contended
/// (retryable, fallback-worthy) rather than a rejected statement.
fn is_unavailable(e: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode;

    match e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.code,
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
        ),
        _ => false,
    }
}
