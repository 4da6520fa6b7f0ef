//! Reference corpus files.
//!
//! Source bytes are read exactly once, fingerprinted, and shared across
//! worker threads for the duration of the run. The engine never interprets
//! the contents — a source file is an opaque byte stream with an identity.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::hash::{canonical_hash, ContentHash, DOMAIN_SOURCE_FILE};

/// An immutable corpus file: identity, content bytes, content fingerprint.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    bytes: Arc<[u8]>,
    fingerprint: ContentHash,
}

impl SourceFile {
    /// Read a file from disk.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be read.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(path.to_path_buf(), bytes))
    }

    /// Build a source file from in-memory bytes (fixtures, tests).
    #[must_use]
    pub fn from_bytes(path: PathBuf, bytes: Vec<u8>) -> Self {
        let fingerprint = canonical_hash(DOMAIN_SOURCE_FILE, &bytes);
        Self {
            path,
            bytes: Arc::from(bytes.into_boxed_slice()),
            fingerprint,
        }
    }

    /// The file's identity path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw content bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A shared handle to the content bytes for worker threads.
    #[must_use]
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// The content fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &ContentHash {
        &self.fingerprint
    }

    /// A short name suitable for a formatter's filename-based dialect
    /// detection (e.g. clang-format's `-assume-filename`).
    #[must_use]
    pub fn filename_hint(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| "source".to_string(), |n| n.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fingerprint_depends_on_content_only() {
        let a = SourceFile::from_bytes(PathBuf::from("a.c"), b"int x;\n".to_vec());
        let b = SourceFile::from_bytes(PathBuf::from("b.c"), b"int x;\n".to_vec());
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = SourceFile::from_bytes(PathBuf::from("a.c"), b"int y;\n".to_vec());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn load_reads_bytes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.c");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"void f() {}\n").unwrap();
        drop(file);

        let source = SourceFile::load(&path).unwrap();
        assert_eq!(source.bytes(), b"void f() {}\n");
        assert_eq!(source.filename_hint(), "sample.c");
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SourceFile::load(&dir.path().join("absent.c")).is_err());
    }

    #[test]
    fn filename_hint_falls_back() {
        let source = SourceFile::from_bytes(PathBuf::from("/"), Vec::new());
        assert_eq!(source.filename_hint(), "source");
    }
}
