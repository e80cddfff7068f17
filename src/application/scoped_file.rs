//! Scoped temporary blob files.
//!
//! The upload ingress lands multipart files on local disk before handing
//! them to the orchestrator. Releasing that temporary copy after the
//! content-store put returns or fails is the caller's obligation, not the
//! store's; wrapping the path in `ScopedBlobFile` discharges it on drop,
//! success and failure alike.

use std::path::{Path, PathBuf};

/// A temporary local file removed when the guard is dropped.
pub struct ScopedBlobFile {
    path: PathBuf,
}

impl ScopedBlobFile {
    /// Take ownership of a temporary file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The wrapped path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file contents.
    ///
    /// # Errors
    /// Returns the underlying IO error; the file is still removed on drop.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

impl Drop for ScopedBlobFile {
    fn drop(&mut self) {
        // Removal is best-effort; a leftover temp file is an operational
        // nuisance, not a correctness problem.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove temp blob file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::uuid_v4;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("healthchain-test-{}", uuid_v4()))
    }

    #[test]
    fn test_read_then_drop_removes_file() {
        let path = temp_path();
        std::fs::write(&path, b"blob body").expect("Should write");

        {
            let scoped = ScopedBlobFile::new(&path);
            assert_eq!(scoped.read().expect("Should read"), b"blob body");
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_file_even_unread() {
        let path = temp_path();
        std::fs::write(&path, b"never read").expect("Should write");

        drop(ScopedBlobFile::new(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_drop_is_quiet() {
        // Guard over a path that was never created; drop must not panic.
        drop(ScopedBlobFile::new(temp_path()));
    }
}
