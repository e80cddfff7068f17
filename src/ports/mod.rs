//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the three independently fallible external
//! systems: the content-addressed blob store, the durable patient registry,
//! and the append-only audit ledger.

mod content_store;
mod ledger;
mod matcher;
mod registry;

pub use content_store::{ContentStore, ContentStoreError};
pub use ledger::{AuditLedger, LedgerError};
pub use matcher::{ExactDigestMatcher, Matcher};
pub use registry::{CreateOutcome, Registry, RegistryError};

pub(crate) use registry::validate_record;
