//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases: patient registration, fingerprint matching,
//! and offline record compaction.

mod compaction;
mod registration;
mod retry;
mod scoped_file;

pub use compaction::{CompactionReport, CompactionService};
pub use registration::{PatientHistory, Registration, RegistrationService};
pub use retry::RetryPolicy;
pub use scoped_file::ScopedBlobFile;
