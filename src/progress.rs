//! Progress-callback trait for strategy and page events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks its strategy list and processes pages.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2text::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl ExtractionProgressCallback for PageCounter {
//!     fn on_page_complete(&self, _strategy: &str, _page_num: usize, _total: usize, _chars: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the extraction pipeline as it runs.
///
/// Page events come from worker tasks and may arrive concurrently and out of
/// page order. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once per document, before the input is validated.
    ///
    /// Always paired with [`Self::on_document_complete`], also for rejected
    /// inputs.
    fn on_document_start(&self, path: &Path) {
        let _ = path;
    }

    /// Called before a strategy is attempted.
    fn on_strategy_start(&self, strategy: &str, total_pages: Option<usize>) {
        let _ = (strategy, total_pages);
    }

    /// Called when one page of a strategy produced text (possibly empty).
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `chars`: characters of cleaned text for this page
    fn on_page_complete(&self, strategy: &str, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (strategy, page_num, total_pages, chars);
    }

    /// Called when one page of a strategy failed.
    fn on_page_error(&self, strategy: &str, page_num: usize, total_pages: usize, error: &str) {
        let _ = (strategy, page_num, total_pages, error);
    }

    /// Called when a strategy finished without producing text or failed.
    fn on_strategy_fallthrough(&self, strategy: &str, reason: &str) {
        let _ = (strategy, reason);
    }

    /// Called once per document with the final outcome.
    ///
    /// `strategy` is `None` when every strategy came up empty.
    fn on_document_complete(&self, path: &Path, strategy: Option<&str>, chars: usize) {
        let _ = (path, strategy, chars);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        errors: AtomicUsize,
        fallthroughs: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_page_complete(&self, _s: &str, _p: usize, _t: usize, _c: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _s: &str, _p: usize, _t: usize, _e: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_strategy_fallthrough(&self, _s: &str, _r: &str) {
            self.fallthroughs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start(Path::new("a.pdf"));
        cb.on_strategy_start("ocr", Some(3));
        cb.on_page_complete("ocr", 1, 3, 42);
        cb.on_page_error("ocr", 2, 3, "tesseract missing");
        cb.on_strategy_fallthrough("ocr", "no text");
        cb.on_document_complete(Path::new("a.pdf"), None, 0);
    }

    #[test]
    fn arc_dyn_callback_receives_events() {
        let tracker = Arc::new(TrackingCallback::default());
        let cb: ProgressCallback = tracker.clone();
        cb.on_page_complete("layout", 1, 2, 10);
        cb.on_page_complete("layout", 2, 2, 0);
        cb.on_page_error("ocr", 1, 2, "boom");
        cb.on_strategy_fallthrough("ocr", "all pages failed");
        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.fallthroughs.load(Ordering::SeqCst), 1);
    }
}
