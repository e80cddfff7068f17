//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no external dependencies.
//! All types are serializable and implement strict validation.

mod content;
mod event;
mod identity;
pub(crate) mod ids;
mod patient;

pub use content::{BlobMetadata, ContentRef, MedicalBlob};
pub use event::{AccessEvent, EventKind, TxId};
pub use identity::{FingerprintTemplate, KeyParseError, PatientKey};
pub use patient::{PatientAttributes, PatientRecord, RecordId};
