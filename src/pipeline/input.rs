//! Input validation: turn a user-supplied path into a [`Document`].
//!
//! Every check here runs before any strategy, so a missing or obviously
//! broken file costs one `stat` and a 1 KiB read instead of a pdfium load,
//! a render pass, and two parser attempts.

use crate::error::ExtractError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How far into the file the `%PDF` header may start. Some producers emit
/// junk bytes before it and every mainstream reader tolerates that.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A validated PDF on disk. Transient: one per extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    size_bytes: u64,
}

impl Document {
    /// Path the document was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Check if a path looks like a PDF by extension (case-insensitive).
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Validate `path` and return a [`Document`].
///
/// Fails with an input-class [`ExtractError`] when the path is missing, is
/// not a regular file, is empty, cannot be read, or has no `%PDF` header.
pub fn open_document(path: impl AsRef<Path>) -> Result<Document, ExtractError> {
    let path = path.as_ref().to_path_buf();

    let meta = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => return Err(ExtractError::FileNotFound { path }),
    };

    if !meta.is_file() {
        return Err(ExtractError::NotAFile { path });
    }
    if meta.len() == 0 {
        return Err(ExtractError::EmptyFile { path });
    }

    let mut head = Vec::with_capacity(HEADER_SEARCH_WINDOW);
    match std::fs::File::open(&path) {
        Ok(f) => {
            f.take(HEADER_SEARCH_WINDOW as u64)
                .read_to_end(&mut head)
                .map_err(|e| ExtractError::Internal(format!("read {}: {e}", path.display())))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => return Err(ExtractError::FileNotFound { path }),
    }

    if !head.windows(4).any(|w| w == b"%PDF") {
        let mut magic = [0u8; 4];
        let n = head.len().min(4);
        magic[..n].copy_from_slice(&head[..n]);
        return Err(ExtractError::NotAPdf { path, magic });
    }

    debug!("Validated PDF: {} ({} bytes)", path.display(), meta.len());
    Ok(Document {
        path,
        size_bytes: meta.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = open_document("/definitely/not/a/real/file.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_document(dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::NotAFile { .. }));
    }

    #[test]
    fn zero_byte_file_is_empty() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = open_document(tmp.path()).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyFile { .. }));
    }

    #[test]
    fn non_pdf_is_rejected_with_magic() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"PK\x03\x04zipfile").unwrap();
        match open_document(tmp.path()).unwrap_err() {
            ExtractError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn header_after_leading_junk_is_accepted() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"\xEF\xBB\xBF\n%PDF-1.7\n").unwrap();
        let doc = open_document(tmp.path()).unwrap();
        assert_eq!(doc.size_bytes(), 13);
        assert_eq!(doc.path(), tmp.path());
    }

    #[test]
    fn pdf_extension_check() {
        assert!(has_pdf_extension(Path::new("a/b/Policy.PDF")));
        assert!(has_pdf_extension(Path::new("x.pdf")));
        assert!(!has_pdf_extension(Path::new("x.pdf.txt")));
        assert!(!has_pdf_extension(Path::new("README")));
    }
}
