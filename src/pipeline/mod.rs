//! Building blocks shared by the extraction strategies.
//!
//! Each submodule does one job and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ pool ──▶ postprocess
//! (path)   (pdfium)   (PNG)    (tess/VLM) (slots)  (cleanup)
//! ```
//!
//! 1. [`input`]: validate the user-supplied path
//! 2. [`render`]: rasterise pages and read pdfium's text layer; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]: PNG-encode page images, for tesseract's temp file or a
//!    base64 multimodal request
//! 4. [`ocr`]: recognise one page image
//! 5. [`llm`]: provider resolution and retry/backoff, shared with chat
//! 6. [`pool`]: bounded page worker pool with order-preserving slots
//! 7. [`postprocess`]: deterministic per-page text cleanup

pub mod encode;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pool;
pub mod postprocess;
pub mod render;
