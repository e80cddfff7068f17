//! # Healthchain
//!
//! Core library for fingerprint-keyed patient records:
//! - Identity resolution from opaque biometric templates (digest-based)
//! - Content-addressed storage of medical artifacts
//! - Append-only audit ledger of uploads and accesses
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (patient, content refs, audit events)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (SQLite, in-memory fallback)
//! - `application`: Use cases orchestrating domain and ports
//!
//! The three external systems (content store, durable registry, ledger) fail
//! independently. Registration never succeeds without a registry write, but
//! may succeed with audit appends pending; see `application::RegistrationService`.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use domain::{AccessEvent, ContentRef, FingerprintTemplate, PatientKey, PatientRecord};

/// Result type for Healthchain operations
pub type Result<T> = std::result::Result<T, HealthchainError>;

/// Main error type for Healthchain
#[derive(Debug, thiserror::Error)]
pub enum HealthchainError {
    #[error("Invalid patient data: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Content store operation failed: {0}")]
    ContentStore(#[from] ports::ContentStoreError),

    #[error("Registry operation failed: {0}")]
    Registry(#[from] ports::RegistryError),

    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] ports::LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
