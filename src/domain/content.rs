//! Content-addressed artifact types.
//!
//! A `ContentRef` is the backend-assigned identifier for an uploaded blob.
//! Content addressing guarantees equal content yields the equal identifier,
//! so re-uploading the same bytes is harmless and orphaned blobs left by a
//! partially failed registration are cheap to ignore.

use serde::{Deserialize, Serialize};

/// Immutable identifier for a blob in the content store.
///
/// Equal content always yields the equal ref; a ref is never reused for
/// different content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Wrap a backend-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque metadata carried through to the content store backend.
///
/// The store never interprets these values; they exist for operators browsing
/// the backend (artifact name, category, upload time).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// Display name of the artifact (e.g. original filename)
    pub name: String,

    /// Free-form key/value pairs (category, description, uploadedAt, ...)
    pub keyvalues: Vec<(String, String)>,
}

impl BlobMetadata {
    /// Metadata with a name and no extra key/values.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyvalues: Vec::new(),
        }
    }

    /// Add a key/value pair.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.keyvalues.push((key.into(), value.into()));
        self
    }
}

/// A medical artifact submitted at registration: raw bytes plus the
/// category/description strings declared by the uploader.
#[derive(Debug, Clone)]
pub struct MedicalBlob {
    pub bytes: Vec<u8>,
    pub category: String,
    pub description: String,
}

impl MedicalBlob {
    /// Create a medical blob with its declared category and description.
    pub fn new(bytes: Vec<u8>, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            bytes,
            category: category.into(),
            description: description.into(),
        }
    }
}
