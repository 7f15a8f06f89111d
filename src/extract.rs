//! The fallback pipeline: validate the input, then try each strategy in
//! order until one produces text.
//!
//! Nothing in here fails outward for a single document. Input problems and
//! strategy errors are logged, recorded in the [`ExtractionReport`], and the
//! caller gets empty text. Only folder listing and output writing return
//! [`Pdf2TextError`].

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, Pdf2TextError};
use crate::pipeline::input;
use crate::progress::ProgressCallback;
use crate::strategy::{self, ExtractionStrategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of running one strategy against one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The strategy produced non-blank text and won.
    Success { chars: usize },
    /// The strategy ran but found no text.
    Empty,
    Failed { error: String },
}

/// One strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub outcome: AttemptOutcome,
    pub duration_ms: u64,
}

/// Everything the pipeline knows about one document after running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub path: PathBuf,
    /// Extracted text; empty when nothing worked.
    pub text: String,
    /// Name of the strategy that produced `text`.
    pub strategy: Option<String>,
    /// Why the input was refused before any strategy ran.
    pub rejected: Option<String>,
    pub attempts: Vec<StrategyAttempt>,
    pub duration_ms: u64,
}

impl ExtractionReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            text: String::new(),
            strategy: None,
            rejected: None,
            attempts: Vec::new(),
            duration_ms: 0,
        }
    }

    /// True when some strategy produced text.
    pub fn is_success(&self) -> bool {
        self.strategy.is_some()
    }
}

/// An ordered list of strategies, reusable across documents.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2text::{ExtractionConfig, Extractor};
///
/// # #[tokio::main]
/// # async fn main() {
/// let extractor = Extractor::new(&ExtractionConfig::default());
/// for path in ["a.pdf", "b.pdf"] {
///     let text = extractor.extract_text(path).await;
///     println!("{path}: {} chars", text.len());
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct Extractor {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
    progress: Option<ProgressCallback>,
}

impl Extractor {
    /// Build the strategies named in `config.strategies`.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            strategies: strategy::strategies_from_config(config),
            progress: config.progress_callback.clone(),
        }
    }

    /// Use an explicit strategy list instead of the built-in ones.
    pub fn with_strategies(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self {
            strategies,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Strategy names in the order they will be tried.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the pipeline on one document.
    pub async fn extract(&self, path: impl AsRef<Path>) -> ExtractionReport {
        let path = path.as_ref();
        let start = Instant::now();
        let mut report = ExtractionReport::new(path);
        if let Some(cb) = &self.progress {
            cb.on_document_start(path);
        }

        let document = match input::open_document(path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                report.rejected = Some(e.to_string());
                report.duration_ms = start.elapsed().as_millis() as u64;
                if let Some(cb) = &self.progress {
                    cb.on_document_complete(path, None, 0);
                }
                return report;
            }
        };
        info!(
            "Extracting {} ({} bytes)",
            path.display(),
            document.size_bytes()
        );

        for strategy in &self.strategies {
            let name = strategy.name();
            debug!("{}: trying strategy '{}'", path.display(), name);
            if let Some(cb) = &self.progress {
                cb.on_strategy_start(name, None);
            }

            let attempt_start = Instant::now();
            let result = strategy.attempt(&document).await;
            let duration_ms = attempt_start.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        "{}: strategy '{}' produced {} chars in {}ms",
                        path.display(),
                        name,
                        text.chars().count(),
                        duration_ms
                    );
                    report.attempts.push(StrategyAttempt {
                        strategy: name.to_string(),
                        outcome: AttemptOutcome::Success {
                            chars: text.chars().count(),
                        },
                        duration_ms,
                    });
                    report.strategy = Some(name.to_string());
                    report.text = text;
                    break;
                }
                Ok(_) => {
                    info!("{}: strategy '{}' found no text", path.display(), name);
                    AttemptOutcome::Empty
                }
                Err(e) => {
                    warn!("{}: strategy '{}' failed: {}", path.display(), name, e);
                    AttemptOutcome::from(&e)
                }
            };

            if let Some(cb) = &self.progress {
                let reason = match &outcome {
                    AttemptOutcome::Failed { error } => error.as_str(),
                    _ => "no text",
                };
                cb.on_strategy_fallthrough(name, reason);
            }
            report.attempts.push(StrategyAttempt {
                strategy: name.to_string(),
                outcome,
                duration_ms,
            });
        }

        if report.strategy.is_none() {
            warn!(
                "{}: no strategy produced text ({} tried)",
                path.display(),
                report.attempts.len()
            );
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        if let Some(cb) = &self.progress {
            cb.on_document_complete(
                path,
                report.strategy.as_deref(),
                report.text.chars().count(),
            );
        }
        report
    }

    /// Run the pipeline and keep only the text.
    pub async fn extract_text(&self, path: impl AsRef<Path>) -> String {
        self.extract(path).await.text
    }

    /// Run the pipeline on every `*.pdf` directly inside `dir`, in file-name
    /// order. A bad file yields an empty report; the batch never aborts.
    pub async fn extract_folder(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<Vec<ExtractionReport>, Pdf2TextError> {
        let files = list_pdfs(dir.as_ref())?;
        info!(
            "Processing {} PDF files in {}",
            files.len(),
            dir.as_ref().display()
        );

        let mut reports = Vec::with_capacity(files.len());
        for file in files {
            reports.push(self.extract(&file).await);
        }
        Ok(reports)
    }
}

/// Run the pipeline on one document with the strategies in `config`.
pub async fn extract(path: impl AsRef<Path>, config: &ExtractionConfig) -> ExtractionReport {
    Extractor::new(config).extract(path).await
}

/// Extract the text of one document. Never fails; returns `""` when no
/// strategy produced text.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2text::{extract_text, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let text = extract_text("report.pdf", &ExtractionConfig::default()).await;
/// println!("{text}");
/// # }
/// ```
pub async fn extract_text(path: impl AsRef<Path>, config: &ExtractionConfig) -> String {
    Extractor::new(config).extract_text(path).await
}

/// Synchronous wrapper around [`extract_text`].
///
/// Creates a temporary tokio runtime internally. Must not be called from
/// inside an async context.
pub fn extract_text_sync(path: impl AsRef<Path>, config: &ExtractionConfig) -> String {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(extract_text(path, config)),
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            String::new()
        }
    }
}

/// Batch driver over a folder. See [`Extractor::extract_folder`].
pub async fn extract_folder(
    dir: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<Vec<ExtractionReport>, Pdf2TextError> {
    Extractor::new(config).extract_folder(dir).await
}

/// Extract one document and write its text to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files. An
/// empty extraction still writes an empty file.
pub async fn extract_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionReport, Pdf2TextError> {
    let report = extract(path, config).await;
    write_text_atomic(output_path.as_ref(), &report.text).await?;
    Ok(report)
}

/// Write `text` to `path` via a sibling `.tmp` file.
pub async fn write_text_atomic(path: &Path, text: &str) -> Result<(), Pdf2TextError> {
    let write_err = |e| Pdf2TextError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, text).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// `*.pdf` files (case-insensitive) directly inside `dir`, sorted by name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, Pdf2TextError> {
    let unreadable = |e| Pdf2TextError::FolderUnreadable {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        if input::has_pdf_extension(&path) && !path.is_dir() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

impl From<&ExtractError> for AttemptOutcome {
    fn from(e: &ExtractError) -> Self {
        AttemptOutcome::Failed {
            error: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::Document;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        result: Result<String, ExtractError>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, result: Result<String, ExtractError>) -> Arc<Self> {
            Arc::new(Self {
                name,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn attempt<'a>(&'a self, _document: &'a Document) -> BoxFuture<'a, Result<String, ExtractError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    fn pdf_file() -> tempfile::NamedTempFile {
        let tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        std::fs::write(tmp.path(), b"%PDF-1.4\n%%EOF\n").unwrap();
        tmp
    }

    #[tokio::test]
    async fn first_non_empty_strategy_wins() {
        let failing = Fixed::new(
            "ocr",
            Err(ExtractError::OcrFailure {
                page: 1,
                detail: "boom".into(),
            }),
        );
        let empty = Fixed::new("layout", Ok("  \n".into()));
        let winner = Fixed::new("basic", Ok("hello".into()));
        let never = Fixed::new("extra", Ok("unused".into()));

        let extractor = Extractor::with_strategies(vec![
            failing.clone(),
            empty.clone(),
            winner.clone(),
            never.clone(),
        ]);
        let tmp = pdf_file();
        let report = extractor.extract(tmp.path()).await;

        assert_eq!(report.text, "hello");
        assert_eq!(report.strategy.as_deref(), Some("basic"));
        assert_eq!(report.attempts.len(), 3);
        assert!(matches!(report.attempts[0].outcome, AttemptOutcome::Failed { .. }));
        assert_eq!(report.attempts[1].outcome, AttemptOutcome::Empty);
        assert_eq!(report.attempts[2].outcome, AttemptOutcome::Success { chars: 5 });
        assert_eq!(never.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_input_runs_no_strategy() {
        let strategy = Fixed::new("basic", Ok("text".into()));
        let extractor = Extractor::with_strategies(vec![strategy.clone()]);

        let report = extractor.extract("/definitely/not/here.pdf").await;
        assert_eq!(report.text, "");
        assert!(report.rejected.as_deref().unwrap().contains("not found"));
        assert!(report.attempts.is_empty());
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
    }

    #[derive(Default)]
    struct EventLog(std::sync::Mutex<Vec<String>>);

    impl crate::progress::ExtractionProgressCallback for EventLog {
        fn on_document_start(&self, _path: &Path) {
            self.0.lock().unwrap().push("start".into());
        }

        fn on_strategy_start(&self, strategy: &str, _total_pages: Option<usize>) {
            self.0.lock().unwrap().push(format!("try {strategy}"));
        }

        fn on_document_complete(&self, _path: &Path, strategy: Option<&str>, _chars: usize) {
            self.0
                .lock()
                .unwrap()
                .push(format!("complete {}", strategy.unwrap_or("-")));
        }
    }

    #[tokio::test]
    async fn rejected_input_still_gets_a_start_and_complete_pair() {
        let events = Arc::new(EventLog::default());
        let extractor = Extractor::with_strategies(vec![Fixed::new("basic", Ok("text".into()))])
            .with_progress(events.clone());

        extractor.extract("/definitely/not/here.pdf").await;
        let tmp = pdf_file();
        extractor.extract(tmp.path()).await;

        assert_eq!(
            *events.0.lock().unwrap(),
            vec!["start", "complete -", "start", "try basic", "complete basic"]
        );
    }

    #[test]
    fn strategy_names_follow_chain_order() {
        let extractor = Extractor::with_strategies(vec![
            Fixed::new("ocr", Ok(String::new())),
            Fixed::new("basic", Ok(String::new())),
        ]);
        assert_eq!(extractor.strategy_names(), vec!["ocr", "basic"]);
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let json = serde_json::to_value(AttemptOutcome::Success { chars: 3 }).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["chars"], 3);
        let json = serde_json::to_value(AttemptOutcome::Empty).unwrap();
        assert_eq!(json["status"], "empty");
    }

    #[test]
    fn list_pdfs_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.PDF", "notes.txt", "c.Pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let names: Vec<String> = list_pdfs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf", "c.Pdf"]);
    }

    #[test]
    fn list_pdfs_on_missing_folder_is_an_error() {
        let err = list_pdfs(Path::new("/no/such/folder/anywhere")).unwrap_err();
        assert!(matches!(err, Pdf2TextError::FolderUnreadable { .. }));
    }

    #[tokio::test]
    async fn write_text_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out.txt");
        write_text_atomic(&out, "abc").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "abc");
        assert!(!out.with_extension("txt.tmp").exists());
    }
}
