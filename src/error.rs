//! Error types for the edgequake-pdf2text library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Recoverable**: one extraction strategy (or one page
//!   inside it) failed. The pipeline catches these at the strategy boundary,
//!   logs them, and falls through to the next strategy. They never escape
//!   [`crate::extract::extract_text`].
//!
//! * [`Pdf2TextError`]: **Fatal** for the operation that returns it: a bad
//!   configuration, an unreadable folder, a chat call the provider refused.
//!   Single-document extraction never produces one.

use std::path::PathBuf;
use thiserror::Error;

/// A recoverable failure inside the extraction pipeline.
///
/// Every variant is converted into "empty result, try the next strategy".
/// Stored as a string inside [`crate::extract::StrategyAttempt`] so reports
/// stay serialisable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The path exists but is a directory or another non-file entry.
    #[error("Not a regular file: '{path}'")]
    NotAFile { path: PathBuf },

    /// The file exists but has zero bytes.
    #[error("PDF file is empty (0 bytes): '{path}'")]
    EmptyFile { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but carries no `%PDF` header.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Strategy errors ───────────────────────────────────────────────────
    /// Page-to-image conversion failed. `page` is 1-indexed, 0 for the
    /// whole document.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailure { page: usize, detail: String },

    /// Text recognition on a rendered page failed.
    #[error("OCR failed for page {page}: {detail}")]
    OcrFailure { page: usize, detail: String },

    /// Text-layer extraction failed (`page` is `None` when the document as
    /// a whole could not be parsed).
    #[error("Text-layer parse failed{}: {detail}", page.map(|p| format!(" for page {p}")).unwrap_or_default())]
    ParseFailure { page: Option<usize>, detail: String },

    /// The pdfium shared library could not be bound.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumUnavailable(String),

    /// The strategy could not be constructed (e.g. no vision provider).
    #[error("Strategy '{strategy}' unavailable: {reason}")]
    StrategyUnavailable { strategy: String, reason: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (worker panic, runtime failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// 1-indexed page this error refers to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            ExtractError::RenderFailure { page, .. } | ExtractError::OcrFailure { page, .. } => {
                Some(*page)
            }
            ExtractError::ParseFailure { page, .. } => *page,
            _ => None,
        }
    }

    /// True for errors raised while validating the input path, before any
    /// strategy ran.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExtractError::FileNotFound { .. }
                | ExtractError::NotAFile { .. }
                | ExtractError::EmptyFile { .. }
                | ExtractError::PermissionDenied { .. }
                | ExtractError::NotAPdf { .. }
        )
    }
}

/// Fatal errors returned by the non-extraction parts of the library.
#[derive(Debug, Error)]
pub enum Pdf2TextError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Batch errors ──────────────────────────────────────────────────────
    /// A folder given to the batch driver could not be listed.
    #[error("Cannot read folder '{path}': {source}")]
    FolderUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Tool errors ───────────────────────────────────────────────────────
    /// An external program a strategy needs could not be started.
    #[error("External tool '{tool}' is not available.\n{hint}")]
    ToolNotFound { tool: String, hint: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API kept failing after all retries.
    #[error("LLM API error after {retries} retries: {message}")]
    LlmApiError { retries: u32, message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_display_with_page() {
        let e = ExtractError::ParseFailure {
            page: Some(3),
            detail: "bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("for page 3"), "got: {msg}");
        assert!(msg.contains("bad xref"));
    }

    #[test]
    fn parse_failure_display_without_page() {
        let e = ExtractError::ParseFailure {
            page: None,
            detail: "trailer missing".into(),
        };
        assert_eq!(e.to_string(), "Text-layer parse failed: trailer missing");
    }

    #[test]
    fn page_accessor() {
        let e = ExtractError::OcrFailure {
            page: 2,
            detail: "tesseract exited 1".into(),
        };
        assert_eq!(e.page(), Some(2));
        assert_eq!(ExtractError::Internal("x".into()).page(), None);
    }

    #[test]
    fn input_errors_are_classified() {
        assert!(ExtractError::EmptyFile {
            path: "a.pdf".into()
        }
        .is_input_error());
        assert!(!ExtractError::RenderFailure {
            page: 1,
            detail: "oom".into()
        }
        .is_input_error());
    }

    #[test]
    fn llm_api_error_display() {
        let e = Pdf2TextError::LlmApiError {
            retries: 3,
            message: "connection refused".into(),
        };
        assert!(e.to_string().contains("3 retries"));
        assert!(e.to_string().contains("connection refused"));
    }
}
