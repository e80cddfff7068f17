//! Adapters layer: Concrete implementations of ports.
//!
//! - `sqlite`: durable registry, content store, and ledger on SQLite
//! - `memory`: in-process implementations (fallback store, tests)
//! - `fallback`: durable-primary registry with in-process degraded mode
//! - `sanitize`: PII filtering for logs

pub mod fallback;
pub mod memory;
pub mod sanitize;
pub mod sqlite;

pub use fallback::FallbackRegistry;
pub use memory::{MemoryContentStore, MemoryLedger, MemoryRegistry};
pub use sqlite::{SqliteContentStore, SqliteLedger, SqliteRegistry};
