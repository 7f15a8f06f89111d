//! Extraction strategies.
//!
//! A strategy turns a validated [`Document`] into text or fails. The
//! pipeline in [`crate::extract`] only knows the [`ExtractionStrategy`]
//! trait, so a new backend is one `impl` away and never duplicates the
//! fallthrough logic.
//!
//! | Strategy | Reads | Page fan-out |
//! |----------|-------|--------------|
//! | [`OcrStrategy`]    | rendered page images | OCR engine per page, bounded pool |
//! | [`LayoutStrategy`] | pdfium text layer    | sequential, one pdfium session |
//! | [`BasicStrategy`]  | lopdf text layer     | sequential |

use crate::config::{ExtractionConfig, StrategyKind};
use crate::error::{ExtractError, Pdf2TextError};
use crate::pipeline::input::Document;
use crate::pipeline::ocr::{self, OcrEngine};
use crate::pipeline::pool::{self, PageOutcome};
use crate::pipeline::render::{self, PdfiumRasterizer, Rasterizer};
use crate::progress::ProgressCallback;
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One way of getting text out of a document.
pub trait ExtractionStrategy: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Extract the full text of `document`.
    ///
    /// `Ok("")` and `Err(_)` both make the pipeline fall through to the next
    /// strategy; the distinction only shows up in logs and reports.
    fn attempt<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, Result<String, ExtractError>>;
}

/// Instantiate the built-in strategies in `config.strategies` order.
///
/// A strategy that cannot be built keeps its place in the list as an
/// [`UnavailableStrategy`], so the failure is logged per document and the
/// chain still falls through to the remaining strategies.
pub fn strategies_from_config(config: &ExtractionConfig) -> Vec<Arc<dyn ExtractionStrategy>> {
    config
        .strategies
        .iter()
        .map(|kind| -> Arc<dyn ExtractionStrategy> {
            match kind {
                StrategyKind::Ocr => match OcrStrategy::from_config(config) {
                    Ok(s) => Arc::new(s),
                    Err(e) => {
                        warn!("OCR strategy disabled: {e}");
                        Arc::new(UnavailableStrategy::new(kind.as_str(), e))
                    }
                },
                StrategyKind::Layout => Arc::new(LayoutStrategy::new(config)),
                StrategyKind::Basic => Arc::new(BasicStrategy::new(config)),
            }
        })
        .collect()
}

/// Placeholder for a strategy whose construction failed. Always fails.
pub struct UnavailableStrategy {
    name: String,
    reason: String,
}

impl UnavailableStrategy {
    pub fn new(name: impl Into<String>, reason: Pdf2TextError) -> Self {
        Self {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl ExtractionStrategy for UnavailableStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn attempt<'a>(&'a self, _document: &'a Document) -> BoxFuture<'a, Result<String, ExtractError>> {
        let err = ExtractError::StrategyUnavailable {
            strategy: self.name.clone(),
            reason: self.reason.clone(),
        };
        Box::pin(async move { Err(err) })
    }
}

// ── OCR ──────────────────────────────────────────────────────────────────────

/// Rasterise every page, then OCR the images concurrently.
pub struct OcrStrategy {
    rasterizer: Arc<dyn Rasterizer>,
    engine: Arc<dyn OcrEngine>,
    concurrency: usize,
    progress: Option<ProgressCallback>,
}

impl OcrStrategy {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        engine: Arc<dyn OcrEngine>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            rasterizer,
            engine,
            concurrency: config.concurrency,
            progress: config.progress_callback.clone(),
        }
    }

    /// pdfium rasteriser plus the engine named by `config.ocr_engine`.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, Pdf2TextError> {
        Ok(Self::new(
            Arc::new(PdfiumRasterizer::new(config)),
            ocr::engine_from_config(config)?,
            config,
        ))
    }
}

impl ExtractionStrategy for OcrStrategy {
    fn name(&self) -> &str {
        StrategyKind::Ocr.as_str()
    }

    fn attempt<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, Result<String, ExtractError>> {
        Box::pin(async move {
            let pages = self.rasterizer.rasterize(document).await?;
            let total = pages.len();
            if total == 0 {
                info!("ocr: no pages rendered from {}", document.path().display());
                return Ok(String::new());
            }
            debug!("ocr: {} pages rendered, engine={}", total, self.engine.name());

            let jobs: Vec<pool::PageJob> = pages
                .into_iter()
                .map(|page| (page.index, self.engine.recognize(page)))
                .collect();

            let slots = pool::collect_pages(
                self.name(),
                total,
                jobs,
                self.concurrency,
                self.progress.as_ref(),
            )
            .await;
            pool::join_pages(slots)
        })
    }
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// pdfium text layer, pages read in order from one document handle.
///
/// pdfium is serialised process-wide, so per-page workers would only queue
/// behind each other and reopen the file every time.
#[derive(Clone)]
pub struct LayoutStrategy {
    password: Option<String>,
    progress: Option<ProgressCallback>,
}

impl LayoutStrategy {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            password: config.password.clone(),
            progress: config.progress_callback.clone(),
        }
    }
}

impl ExtractionStrategy for LayoutStrategy {
    fn name(&self) -> &str {
        StrategyKind::Layout.as_str()
    }

    fn attempt<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, Result<String, ExtractError>> {
        Box::pin(async move {
            let path = document.path().to_path_buf();
            let password = self.password.clone();
            let progress = self.progress.clone();
            let slots = tokio::task::spawn_blocking(move || {
                let pages = render::text_layer_pages_blocking(&path, password.as_deref())?;
                let total = pages.len();
                debug!("layout: {} pages", total);
                Ok::<_, ExtractError>(
                    pages
                        .into_iter()
                        .enumerate()
                        .map(|(index, result)| {
                            pool::settle_page(
                                StrategyKind::Layout.as_str(),
                                index,
                                total,
                                result,
                                progress.as_ref(),
                            )
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .await
            .map_err(|e| ExtractError::Internal(format!("Layout extraction panicked: {e}")))??;
            pool::join_pages(slots)
        })
    }
}

// ── Basic ────────────────────────────────────────────────────────────────────

/// lopdf text layer, pages read one after another.
#[derive(Clone)]
pub struct BasicStrategy {
    progress: Option<ProgressCallback>,
}

impl BasicStrategy {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            progress: config.progress_callback.clone(),
        }
    }
}

impl ExtractionStrategy for BasicStrategy {
    fn name(&self) -> &str {
        StrategyKind::Basic.as_str()
    }

    fn attempt<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, Result<String, ExtractError>> {
        Box::pin(async move {
            let path = document.path().to_path_buf();
            let progress = self.progress.clone();
            let slots = tokio::task::spawn_blocking(move || {
                basic_pages_blocking(&path, progress.as_ref())
            })
            .await
            .map_err(|e| ExtractError::Internal(format!("Basic extraction panicked: {e}")))??;
            pool::join_pages(slots)
        })
    }
}

/// Load with lopdf and read every page in order.
///
/// A page whose text cannot be decoded is recorded as failed and skipped,
/// matching the "take whatever text is available" nature of this strategy.
fn basic_pages_blocking(
    pdf_path: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<PageOutcome>, ExtractError> {
    let strategy = StrategyKind::Basic.as_str();
    let doc = lopdf::Document::load(pdf_path).map_err(|e| ExtractError::ParseFailure {
        page: None,
        detail: e.to_string(),
    })?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let total = page_numbers.len();
    debug!("basic: {} pages", total);

    let slots = page_numbers
        .into_iter()
        .enumerate()
        .map(|(index, page_number)| {
            let result = doc
                .extract_text(&[page_number])
                .map_err(|e| ExtractError::ParseFailure {
                    page: Some(index + 1),
                    detail: e.to_string(),
                });
            pool::settle_page(strategy, index, total, result, progress)
        })
        .collect();

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_strategies_follow_config_order() {
        let config = ExtractionConfig::builder()
            .strategies(vec![StrategyKind::Basic, StrategyKind::Ocr, StrategyKind::Layout])
            .build()
            .unwrap();
        let names: Vec<String> = strategies_from_config(&config)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["basic", "ocr", "layout"]);
    }

    #[tokio::test]
    async fn unavailable_strategy_always_fails() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"%PDF-1.4\n").unwrap();
        let doc = crate::pipeline::input::open_document(tmp.path()).unwrap();

        let strategy = UnavailableStrategy::new(
            "ocr",
            Pdf2TextError::ProviderNotConfigured {
                provider: "ollama".into(),
                hint: "not running".into(),
            },
        );
        let err = strategy.attempt(&doc).await.unwrap_err();
        assert!(matches!(err, ExtractError::StrategyUnavailable { .. }));
        assert!(err.to_string().contains("ollama"));
    }
}
