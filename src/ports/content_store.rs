//! Content store port: Trait for content-addressed blob storage.
//!
//! The backend assigns identifiers by content, so `put` is idempotent:
//! uploading identical bytes twice yields the identical ref and is never an
//! error. Metadata is carried through opaquely, not interpreted.

use crate::domain::{BlobMetadata, ContentRef};

/// Error type for content store operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentStoreError {
    /// The backend rejected or failed the upload. Retryable up to the
    /// orchestrator's configured bound, then surfaced.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// No blob is stored under the given ref.
    #[error("Content not found: {0}")]
    NotFound(ContentRef),
}

impl ContentStoreError {
    /// Whether the orchestrator may retry the failed call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upload(_))
    }
}

/// Trait for content-addressed blob storage.
pub trait ContentStore: Send + Sync {
    /// Upload a blob and return its content-derived identifier.
    ///
    /// Safe to retry: identical bytes always yield the identical ref.
    /// Releasing any temporary local copy of the blob afterwards is the
    /// caller's obligation (see `application::ScopedBlobFile`).
    ///
    /// # Errors
    /// Returns `Upload` if the backend rejects or fails the call.
    fn put(&self, blob: &[u8], metadata: &BlobMetadata) -> Result<ContentRef, ContentStoreError>;

    /// Download a blob by its identifier.
    ///
    /// # Errors
    /// Returns `NotFound` if no blob is stored under the ref.
    fn get(&self, r: &ContentRef) -> Result<Vec<u8>, ContentStoreError>;
}
