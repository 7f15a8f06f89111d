//! # edgequake-pdf2text
//!
//! Best-effort plain-text extraction from PDF documents, plus a small chat
//! loop that answers questions about the extracted text with a local LLM.
//!
//! ## Strategies
//!
//! No single extraction method works on every PDF. Scanned documents have no
//! text layer at all; born-digital ones often have a perfectly good one that
//! OCR would only degrade; some files confuse one parser but not another.
//! This crate tries several strategies in order and returns the first text
//! that comes back non-empty.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input   validate path, size and %PDF header
//!  ├─ 2. OCR     rasterise pages (pdfium) → tesseract / vision LLM, parallel
//!  ├─ 3. Layout  pdfium text layer, one document handle
//!  ├─ 4. Basic   lopdf text layer, sequential
//!  └─ 5. Output  first non-empty result, or "" if all came up empty
//! ```
//!
//! Within a strategy, page order in the output always equals physical page
//! order regardless of which worker finished first.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2text::{extract_text, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let text = extract_text("document.pdf", &ExtractionConfig::default()).await;
//!     if text.is_empty() {
//!         eprintln!("no text found");
//!     }
//!     println!("{text}");
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2text` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2text = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Strategy | Needs |
//! |----------|-------|
//! | `ocr` (tesseract) | pdfium shared library + `tesseract` on `PATH` |
//! | `ocr` (vision)    | pdfium shared library + an LLM provider (Ollama by default) |
//! | `layout`          | pdfium shared library |
//! | `basic`           | nothing |
//!
//! A missing tool makes its strategy fail, and the chain moves on.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod strategy;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ChatConfig, ExtractionConfig, ExtractionConfigBuilder, OcrEngineKind, StrategyKind};
pub use conversation::ConversationLog;
pub use error::{ExtractError, Pdf2TextError};
pub use extract::{
    extract, extract_folder, extract_text, extract_text_sync, extract_to_file, AttemptOutcome,
    ExtractionReport, Extractor, StrategyAttempt,
};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use strategy::{BasicStrategy, ExtractionStrategy, LayoutStrategy, OcrStrategy};
