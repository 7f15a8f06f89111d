//! Bounded page-level worker pool with order-preserving reassembly.
//!
//! Jobs complete in whatever order the scheduler picks. Each job is tagged
//! with its 0-based page index and its result lands in `slots[index]`; the
//! joined text is built by walking the slots in index order, so output order
//! never depends on completion order.

use crate::error::ExtractError;
use crate::pipeline::postprocess::clean_page_text;
use crate::progress::ProgressCallback;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

/// One page's work, tagged with its 0-based page index.
pub type PageJob = (usize, BoxFuture<'static, Result<String, ExtractError>>);

/// Outcome of one page job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// No job was scheduled for this slot.
    Missing,
    /// Cleaned page text (may be empty).
    Text(String),
    Failed(ExtractError),
}

/// Clean one raw page result and report it to `progress`.
///
/// `index` is 0-based; callbacks and log lines use 1-based page numbers.
pub fn settle_page(
    strategy: &str,
    index: usize,
    page_count: usize,
    result: Result<String, ExtractError>,
    progress: Option<&ProgressCallback>,
) -> PageOutcome {
    let page_num = index + 1;
    match result {
        Ok(raw) => {
            let text = clean_page_text(&raw);
            debug!("{strategy}: page {page_num}/{page_count} → {} chars", text.len());
            if let Some(cb) = progress {
                cb.on_page_complete(strategy, page_num, page_count, text.chars().count());
            }
            PageOutcome::Text(text)
        }
        Err(e) => {
            warn!("{strategy}: page {page_num}/{page_count} failed: {e}");
            if let Some(cb) = progress {
                cb.on_page_error(strategy, page_num, page_count, &e.to_string());
            }
            PageOutcome::Failed(e)
        }
    }
}

/// Drive `jobs` with at most `concurrency` in flight and collect the
/// outcomes into `page_count` slots.
pub async fn collect_pages(
    strategy: &str,
    page_count: usize,
    jobs: Vec<PageJob>,
    concurrency: usize,
    progress: Option<&ProgressCallback>,
) -> Vec<PageOutcome> {
    let mut slots: Vec<PageOutcome> = vec![PageOutcome::Missing; page_count];

    let tagged: Vec<BoxFuture<'static, (usize, Result<String, ExtractError>)>> = jobs
        .into_iter()
        .map(|(index, job)| -> BoxFuture<'static, _> { Box::pin(async move { (index, job.await) }) })
        .collect();

    let mut completed = stream::iter(tagged).buffer_unordered(concurrency.max(1));

    while let Some((index, result)) = completed.next().await {
        let outcome = settle_page(strategy, index, page_count, result, progress);
        match slots.get_mut(index) {
            Some(slot) => *slot = outcome,
            None => warn!("{strategy}: dropping result for out-of-range page {}", index + 1),
        }
    }

    slots
}

/// Join page slots in index order.
///
/// Empty pages contribute nothing; the rest are separated by a single
/// newline. If at least one page was attempted and every attempted page
/// failed, the first failure is returned instead.
pub fn join_pages(slots: Vec<PageOutcome>) -> Result<String, ExtractError> {
    let attempted = slots
        .iter()
        .filter(|s| !matches!(s, PageOutcome::Missing))
        .count();

    let mut texts = Vec::with_capacity(slots.len());
    let mut first_error = None;
    let mut failed = 0usize;

    for slot in slots {
        match slot {
            PageOutcome::Text(t) if !t.is_empty() => texts.push(t),
            PageOutcome::Failed(e) => {
                failed += 1;
                first_error.get_or_insert(e);
            }
            _ => {}
        }
    }

    if attempted > 0 && failed == attempted {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    Ok(texts.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn page_job(index: usize, delay_ms: u64, text: &'static str) -> PageJob {
        let job = async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(text.to_string())
        };
        (index, job.boxed())
    }

    #[tokio::test]
    async fn reassembles_in_page_order_despite_completion_order() {
        // Page 0 finishes last, page 3 first.
        let jobs = vec![
            page_job(0, 80, "one"),
            page_job(1, 60, "two"),
            page_job(2, 40, "three"),
            page_job(3, 0, "four"),
        ];
        let slots = collect_pages("test", 4, jobs, 4, None).await;
        assert_eq!(join_pages(slots).unwrap(), "one\ntwo\nthree\nfour");
    }

    #[tokio::test]
    async fn blocking_jobs_run_in_parallel_and_keep_order() {
        let jobs = (0..6)
            .map(|i| {
                let job = async move {
                    let result: Result<String, ExtractError> =
                        tokio::task::spawn_blocking(move || {
                            std::thread::sleep(Duration::from_millis(10 * (6 - i as u64)));
                            Ok(format!("page {}", i + 1))
                        })
                        .await
                        .map_err(|e| ExtractError::Internal(e.to_string()))?;
                    result
                };
                (i, job.boxed())
            })
            .collect();
        let slots = collect_pages("test", 6, jobs, 3, None).await;
        assert_eq!(
            join_pages(slots).unwrap(),
            "page 1\npage 2\npage 3\npage 4\npage 5\npage 6"
        );
    }

    #[tokio::test]
    async fn collect_pages_future_is_send() {
        fn assert_send<T: Send>(t: T) -> T {
            t
        }
        let jobs = vec![page_job(0, 0, "only")];
        let slots = assert_send(collect_pages("test", 1, jobs, 1, None)).await;
        assert_eq!(join_pages(slots).unwrap(), "only");
    }

    #[derive(Default)]
    struct Recorder {
        done: AtomicUsize,
        errors: Mutex<Vec<usize>>,
    }

    impl crate::progress::ExtractionProgressCallback for Recorder {
        fn on_page_complete(&self, _: &str, _: usize, _: usize, _: usize) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_error(&self, _: &str, page_num: usize, _: usize, _: &str) {
            self.errors.lock().unwrap().push(page_num);
        }
    }

    #[test]
    fn settle_page_cleans_text_and_reports_one_based_pages() {
        let recorder = Arc::new(Recorder::default());
        let cb: ProgressCallback = recorder.clone();

        let ok = settle_page("test", 0, 2, Ok("  hello  \r\n".into()), Some(&cb));
        let failed = settle_page(
            "test",
            1,
            2,
            Err(ExtractError::OcrFailure { page: 2, detail: "x".into() }),
            Some(&cb),
        );

        assert_eq!(ok, PageOutcome::Text("hello".into()));
        assert!(matches!(failed, PageOutcome::Failed(_)));
        assert_eq!(recorder.done.load(Ordering::SeqCst), 1);
        assert_eq!(*recorder.errors.lock().unwrap(), vec![2]);
    }

    #[test]
    fn empty_pages_contribute_nothing() {
        let slots = vec![
            PageOutcome::Text(String::new()),
            PageOutcome::Text("middle".into()),
            PageOutcome::Text(String::new()),
        ];
        assert_eq!(join_pages(slots).unwrap(), "middle");
    }

    #[test]
    fn partial_failure_keeps_surviving_pages() {
        let slots = vec![
            PageOutcome::Failed(ExtractError::OcrFailure {
                page: 1,
                detail: "x".into(),
            }),
            PageOutcome::Text("second".into()),
        ];
        assert_eq!(join_pages(slots).unwrap(), "second");
    }

    #[test]
    fn all_failed_returns_first_error() {
        let slots = vec![
            PageOutcome::Failed(ExtractError::OcrFailure {
                page: 1,
                detail: "first".into(),
            }),
            PageOutcome::Failed(ExtractError::OcrFailure {
                page: 2,
                detail: "second".into(),
            }),
        ];
        let err = join_pages(slots).unwrap_err();
        assert_eq!(err.page(), Some(1));
    }

    #[test]
    fn zero_pages_is_empty_text() {
        assert_eq!(join_pages(Vec::new()).unwrap(), "");
    }

    #[tokio::test]
    async fn out_of_range_results_are_dropped() {
        let jobs = vec![page_job(0, 0, "kept"), page_job(5, 0, "stray")];
        let slots = collect_pages("test", 1, jobs, 2, None).await;
        assert_eq!(slots, vec![PageOutcome::Text("kept".into())]);
    }
}
