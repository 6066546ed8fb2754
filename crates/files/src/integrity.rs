//! Integrity scanning.
//!
//! [`IntegrityScanner`] walks a [`RecordSource`] page by page and asks each record's adapter
//! whether its stored path still exists.
//!
//! # Pagination
//!
//! Pages are fetched strictly in order. The scan ends on the first empty page, or once as many
//! records as the initial count have been processed. The empty-page rule alone guarantees
//! termination when rows are deleted while the scan runs.
//!
//! # Per-record outcomes
//!
//! | outcome                         | counted as   | finding                           |
//! |---------------------------------|--------------|-----------------------------------|
//! | adapter says the file exists    | `checked`    | none                              |
//! | adapter says it does not        | `missing`    | [`Finding::MissingFile`]          |
//! | adapter name not registered     | `unresolved` | [`Finding::AdapterResolution`]    |
//! | adapter failed to answer        | `failed`     | [`Finding::AdapterFailure`]       |
//!
//! Only a failing record source aborts the scan.

use crate::adapter::AdapterRegistry;
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::source::RecordSource;
use crate::ScanError;
use chrono::{DateTime, Utc};
use filestore_types::{NonEmptyText, StoredFile, StoredPath};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How a scan runs.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Records fetched per page.
    pub page_size: usize,
    /// Existence checks in flight at once within a page.
    pub concurrency: usize,
    /// Checked before every page fetch.
    pub cancel: CancellationToken,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_PAGE_SIZE,
            cancel: CancellationToken::new(),
        }
    }
}

impl ScanOptions {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            concurrency: page_size.max(1),
            ..Self::default()
        }
    }
}

/// Something the scan found wrong with a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// The adapter confirmed there is no file at the stored path.
    MissingFile {
        id: String,
        adapter: NonEmptyText,
        path: StoredPath,
    },
    /// The record names an adapter that is not registered.
    AdapterResolution {
        id: String,
        adapter: NonEmptyText,
        path: StoredPath,
        reason: String,
    },
    /// The adapter could not tell whether the file exists.
    AdapterFailure {
        id: String,
        adapter: NonEmptyText,
        path: StoredPath,
        reason: String,
    },
}

impl Finding {
    pub fn id(&self) -> &str {
        match self {
            Self::MissingFile { id, .. }
            | Self::AdapterResolution { id, .. }
            | Self::AdapterFailure { id, .. } => id,
        }
    }

    pub fn adapter(&self) -> &NonEmptyText {
        match self {
            Self::MissingFile { adapter, .. }
            | Self::AdapterResolution { adapter, .. }
            | Self::AdapterFailure { adapter, .. } => adapter,
        }
    }

    pub fn path(&self) -> &StoredPath {
        match self {
            Self::MissingFile { path, .. }
            | Self::AdapterResolution { path, .. }
            | Self::AdapterFailure { path, .. } => path,
        }
    }
}

/// Outcome of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Record count reported by the source before the first page.
    pub total: u64,
    /// Records processed, whatever their outcome.
    pub checked: u64,
    pub missing: u64,
    pub unresolved: u64,
    pub failed: u64,
    /// Pages fetched, including the final empty one.
    pub pages: u64,
    pub cancelled: bool,
    /// Findings in record order.
    pub findings: Vec<Finding>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            total: 0,
            checked: 0,
            missing: 0,
            unresolved: 0,
            failed: 0,
            pages: 0,
            cancelled: false,
            findings: Vec::new(),
            started_at,
            finished_at: None,
        }
    }

    /// True when every checked record was confirmed present.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && !self.cancelled
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    fn record(&mut self, outcome: Outcome) {
        self.checked += 1;
        let finding = match outcome {
            Outcome::Present => return,
            Outcome::Missing(finding) => {
                self.missing += 1;
                finding
            }
            Outcome::Unresolved(finding) => {
                self.unresolved += 1;
                finding
            }
            Outcome::Failed(finding) => {
                self.failed += 1;
                finding
            }
        };
        self.findings.push(finding);
    }
}

enum Outcome {
    Present,
    Missing(Finding),
    Unresolved(Finding),
    Failed(Finding),
}

/// Verifies that stored files still exist on their adapters.
pub struct IntegrityScanner {
    source: Arc<dyn RecordSource>,
    registry: Arc<AdapterRegistry>,
}

impl IntegrityScanner {
    pub fn new(source: Arc<dyn RecordSource>, registry: Arc<AdapterRegistry>) -> Self {
        Self { source, registry }
    }

    /// Runs a full scan.
    ///
    /// Checks within a page run concurrently (bounded by `options.concurrency`) and are
    /// reported in record order once the whole page is done. Cancellation is honoured
    /// between pages; a cancelled scan returns its partial report with `cancelled` set.
    ///
    /// # Errors
    ///
    /// - [`ScanError::InvalidPageSize`] if `options.page_size` is zero.
    /// - [`ScanError::RecordSource`] if counting or fetching a page fails. The error carries
    ///   the report for everything processed so far.
    pub async fn scan(&self, options: &ScanOptions) -> Result<ScanReport, ScanError> {
        if options.page_size == 0 {
            return Err(ScanError::InvalidPageSize);
        }

        let mut report = ScanReport::new(Utc::now());

        report.total = match self.source.count().await {
            Ok(total) => total,
            Err(source) => {
                return Err(ScanError::RecordSource {
                    partial: Box::new(report.finish()),
                    source,
                })
            }
        };
        info!("{} record(s) will be checked.", report.total);

        let mut offset = 0u64;
        loop {
            if options.cancel.is_cancelled() {
                warn!(
                    checked = report.checked,
                    "scan cancelled before page at offset {}", offset
                );
                report.cancelled = true;
                break;
            }

            let page = match self.source.page(offset, options.page_size).await {
                Ok(page) => page,
                Err(source) => {
                    return Err(ScanError::RecordSource {
                        partial: Box::new(report.finish()),
                        source,
                    })
                }
            };
            report.pages += 1;

            if page.is_empty() {
                break;
            }

            let outcomes: Vec<Outcome> = stream::iter(page.iter())
                .map(|record| self.check(record))
                .buffered(options.concurrency.max(1))
                .collect()
                .await;

            for outcome in outcomes {
                report.record(outcome);
            }

            offset += options.page_size as u64;
            info!(
                processed = report.checked,
                "{} of {} records processed.", options.page_size, report.total
            );

            if report.total > 0 && report.checked >= report.total {
                break;
            }
        }

        let report = report.finish();
        info!(
            checked = report.checked,
            missing = report.missing,
            unresolved = report.unresolved,
            failed = report.failed,
            "integrity scan finished"
        );
        Ok(report)
    }

    async fn check(&self, record: &StoredFile) -> Outcome {
        let adapter = match self.registry.resolve(record.adapter.as_str()) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(id = %record.id, adapter = %record.adapter, "{}", e);
                return Outcome::Unresolved(Finding::AdapterResolution {
                    id: record.id.clone(),
                    adapter: record.adapter.clone(),
                    path: record.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        match adapter.has(record.path.as_str()).await {
            Ok(true) => Outcome::Present,
            Ok(false) => {
                warn!(
                    "{} file does not exist (adapter: {}, path: {})",
                    record.id, record.adapter, record.path
                );
                Outcome::Missing(Finding::MissingFile {
                    id: record.id.clone(),
                    adapter: record.adapter.clone(),
                    path: record.path.clone(),
                })
            }
            Err(e) => {
                warn!(
                    id = %record.id,
                    adapter = %record.adapter,
                    path = %record.path,
                    "existence check failed: {}",
                    e
                );
                Outcome::Failed(Finding::AdapterFailure {
                    id: record.id.clone(),
                    adapter: record.adapter.clone(),
                    path: record.path.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{LocalAdapter, MemoryAdapter};
    use crate::source::MemoryRecordSource;
    use crate::SourceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn stored(id: &str, adapter: &str, path: &str) -> StoredFile {
        StoredFile::new(
            id,
            NonEmptyText::new(adapter).unwrap(),
            StoredPath::new(path).unwrap(),
        )
    }

    /// Wraps a source and counts page fetches.
    struct CountingSource<S> {
        inner: S,
        pages: AtomicUsize,
    }

    impl<S> CountingSource<S> {
        fn new(inner: S) -> Self {
            Self {
                inner,
                pages: AtomicUsize::new(0),
            }
        }

        fn pages(&self) -> usize {
            self.pages.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<S: RecordSource> RecordSource for CountingSource<S> {
        async fn count(&self) -> Result<u64, SourceError> {
            self.inner.count().await
        }

        async fn page(&self, offset: u64, limit: usize) -> Result<Vec<StoredFile>, SourceError> {
            self.pages.fetch_add(1, Ordering::SeqCst);
            self.inner.page(offset, limit).await
        }
    }

    /// Fails on the nth page fetch (0-based).
    struct FailingSource {
        inner: MemoryRecordSource,
        fail_at: usize,
        pages: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for FailingSource {
        async fn count(&self) -> Result<u64, SourceError> {
            self.inner.count().await
        }

        async fn page(&self, offset: u64, limit: usize) -> Result<Vec<StoredFile>, SourceError> {
            if self.pages.fetch_add(1, Ordering::SeqCst) == self.fail_at {
                return Err(SourceError::Unavailable("connection reset".into()));
            }
            self.inner.page(offset, limit).await
        }
    }

    /// Reports a count that never matches the data, and deletes a record after the first page.
    struct ShrinkingSource {
        inner: Arc<MemoryRecordSource>,
        delete_after_first: String,
        pages: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for ShrinkingSource {
        async fn count(&self) -> Result<u64, SourceError> {
            Ok(1_000)
        }

        async fn page(&self, offset: u64, limit: usize) -> Result<Vec<StoredFile>, SourceError> {
            let page = self.inner.page(offset, limit).await;
            if self.pages.fetch_add(1, Ordering::SeqCst) == 0 {
                self.inner.remove(&self.delete_after_first);
            }
            page
        }
    }

    /// Cancels `cancel` right after the first page has been fetched.
    struct CancellingSource {
        inner: MemoryRecordSource,
        cancel: CancellationToken,
        pages: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for CancellingSource {
        async fn count(&self) -> Result<u64, SourceError> {
            self.inner.count().await
        }

        async fn page(&self, offset: u64, limit: usize) -> Result<Vec<StoredFile>, SourceError> {
            let page = self.inner.page(offset, limit).await;
            if self.pages.fetch_add(1, Ordering::SeqCst) == 0 {
                self.cancel.cancel();
            }
            page
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn registry_with(name: &str, adapter: MemoryAdapter) -> Arc<AdapterRegistry> {
        let mut registry = AdapterRegistry::new();
        registry.register(name, Arc::new(adapter));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_scan_empty_source() {
        let source = Arc::new(CountingSource::new(MemoryRecordSource::default()));
        let scanner =
            IntegrityScanner::new(source.clone(), registry_with("Local", MemoryAdapter::new()));

        let report = scanner.scan(&ScanOptions::with_page_size(50)).await.unwrap();

        assert_eq!(report.checked, 0);
        assert_eq!(report.missing, 0);
        assert_eq!(report.pages, 1);
        assert_eq!(source.pages(), 1);
        assert!(report.is_clean());
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_scan_reports_missing_files() {
        let adapter = MemoryAdapter::with_paths(["a/a.png", "c/c.png"]);
        let source = MemoryRecordSource::new(vec![
            stored("a", "Local", "a/a.png"),
            stored("b", "Local", "b/b.png"),
            stored("c", "Local", "c/c.png"),
        ]);
        let scanner = IntegrityScanner::new(Arc::new(source), registry_with("Local", adapter));

        let report = scanner.scan(&ScanOptions::with_page_size(2)).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.checked, 3);
        assert_eq!(report.missing, 1);
        assert_eq!(
            report.findings,
            vec![Finding::MissingFile {
                id: "b".into(),
                adapter: NonEmptyText::new("Local").unwrap(),
                path: StoredPath::new("b/b.png").unwrap(),
            }]
        );
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_scan_continues_past_unknown_adapter() {
        // Three pages of two; the second page holds a record on an unregistered adapter.
        let adapter = MemoryAdapter::with_paths(["p1/a", "p2/d", "p3/e"]);
        let source = Arc::new(CountingSource::new(MemoryRecordSource::new(vec![
            stored("a", "Local", "p1/a"),
            stored("b", "Local", "p1/b"),
            stored("c", "Dropbox", "p2/c"),
            stored("d", "Local", "p2/d"),
            stored("e", "Local", "p3/e"),
            stored("f", "Local", "p3/f"),
        ])));
        let scanner = IntegrityScanner::new(source.clone(), registry_with("Local", adapter));

        let report = scanner.scan(&ScanOptions::with_page_size(2)).await.unwrap();

        assert_eq!(report.checked, 6);
        assert_eq!(report.missing, 2);
        assert_eq!(report.unresolved, 1);
        assert_eq!(source.pages(), 3);

        let ids: Vec<&str> = report.findings.iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["b", "c", "f"]);
        assert!(matches!(
            &report.findings[1],
            Finding::AdapterResolution { adapter, .. } if adapter.as_str() == "Dropbox"
        ));
    }

    #[tokio::test]
    async fn test_scan_adapter_failure_is_not_missing() {
        let adapter = MemoryAdapter::with_paths(["a", "b"]);
        adapter.fail_on("a");
        let source = MemoryRecordSource::new(vec![
            stored("a", "Local", "a"),
            stored("b", "Local", "b"),
        ]);
        let scanner = IntegrityScanner::new(Arc::new(source), registry_with("Local", adapter));

        let report = scanner.scan(&ScanOptions::default()).await.unwrap();

        assert_eq!(report.checked, 2);
        assert_eq!(report.missing, 0);
        assert_eq!(report.failed, 1);
        assert!(matches!(
            &report.findings[0],
            Finding::AdapterFailure { reason, .. } if reason.contains("simulated failure")
        ));
    }

    #[tokio::test]
    async fn test_scan_source_failure_keeps_partial_report() {
        let source = FailingSource {
            inner: MemoryRecordSource::new(vec![
                stored("a", "Local", "a"),
                stored("b", "Local", "b"),
                stored("c", "Local", "c"),
            ]),
            fail_at: 1,
            pages: AtomicUsize::new(0),
        };
        let scanner = IntegrityScanner::new(
            Arc::new(source),
            registry_with("Local", MemoryAdapter::with_paths(["a"])),
        );

        let result = scanner.scan(&ScanOptions::with_page_size(2)).await;

        match result {
            Err(ScanError::RecordSource { partial, source }) => {
                assert_eq!(partial.checked, 2);
                assert_eq!(partial.missing, 1);
                assert!(partial.finished_at.is_some());
                assert!(matches!(source, SourceError::Unavailable(_)));
            }
            _ => panic!("Expected RecordSource error"),
        }
    }

    #[tokio::test]
    async fn test_scan_terminates_when_rows_disappear() {
        let inner = Arc::new(MemoryRecordSource::new(vec![
            stored("a", "Local", "a"),
            stored("b", "Local", "b"),
            stored("c", "Local", "c"),
        ]));
        let source = ShrinkingSource {
            inner,
            delete_after_first: "a".into(),
            pages: AtomicUsize::new(0),
        };
        let scanner = IntegrityScanner::new(
            Arc::new(source),
            registry_with("Local", MemoryAdapter::with_paths(["a", "b", "c"])),
        );

        let report = scanner.scan(&ScanOptions::with_page_size(2)).await.unwrap();

        // The count never matches; the empty page ends the scan.
        assert_eq!(report.total, 1_000);
        assert_eq!(report.checked, 2);
        assert_eq!(report.pages, 2);
    }

    #[tokio::test]
    async fn test_scan_cancelled_before_first_page() {
        let source = Arc::new(CountingSource::new(MemoryRecordSource::new(vec![stored(
            "a", "Local", "a",
        )])));
        let scanner =
            IntegrityScanner::new(source.clone(), registry_with("Local", MemoryAdapter::new()));

        let options = ScanOptions::default();
        options.cancel.cancel();
        let report = scanner.scan(&options).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.checked, 0);
        assert_eq!(source.pages(), 0);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_scan_rejects_zero_page_size() {
        let scanner = IntegrityScanner::new(
            Arc::new(MemoryRecordSource::default()),
            registry_with("Local", MemoryAdapter::new()),
        );

        let result = scanner.scan(&ScanOptions::with_page_size(0)).await;
        assert!(matches!(result, Err(ScanError::InvalidPageSize)));
    }

    #[tokio::test]
    async fn test_scan_local_adapter() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("07/3e/d7")).unwrap();
        std::fs::write(temp.path().join("07/3e/d7/present.png"), b"png").unwrap();

        let mut registry = AdapterRegistry::new();
        registry.register("Local", Arc::new(LocalAdapter::new(temp.path()).unwrap()));

        let source = MemoryRecordSource::new(vec![
            stored("present", "Local", "07/3e/d7/present.png"),
            stored("gone", "Local", "07/3e/d7/gone.png"),
            stored("escape", "Local", "../outside.png"),
        ]);
        let scanner = IntegrityScanner::new(Arc::new(source), Arc::new(registry));

        let report = scanner.scan(&ScanOptions::default()).await.unwrap();

        assert_eq!(report.checked, 3);
        assert_eq!(report.missing, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_report_serializes_findings_with_kind() {
        let source = MemoryRecordSource::new(vec![stored("x", "Local", "x/x.bin")]);
        let scanner =
            IntegrityScanner::new(Arc::new(source), registry_with("Local", MemoryAdapter::new()));

        let report = scanner.scan(&ScanOptions::default()).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["missing"], 1);
        assert_eq!(json["findings"][0]["kind"], "missing_file");
        assert_eq!(json["findings"][0]["path"], "x/x.bin");
    }

    #[tokio::test]
    async fn test_scan_cancelled_between_pages() {
        let options = ScanOptions::with_page_size(2);
        let source = Arc::new(CancellingSource {
            inner: MemoryRecordSource::new(vec![
                stored("a", "Local", "a"),
                stored("b", "Local", "b"),
                stored("c", "Local", "c"),
                stored("d", "Local", "d"),
            ]),
            cancel: options.cancel.clone(),
            pages: AtomicUsize::new(0),
        });
        let adapter = MemoryAdapter::with_paths(["a", "b", "c", "d"]);
        let scanner = IntegrityScanner::new(source.clone(), registry_with("Local", adapter));

        let report = scanner.scan(&options).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.checked, 2);
        assert_eq!(report.pages, 1);
        assert_eq!(source.pages.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scan_checks_stored_path_verbatim() {
        let adapter = MemoryAdapter::with_paths(["docs/report.pdf ", " a/b.png"]);
        let source = MemoryRecordSource::new(vec![
            stored("a1", "Local", "docs/report.pdf "),
            stored("a2", "Local", " a/b.png"),
            stored("a3", "Local", "docs/other.pdf "),
        ]);
        let scanner = IntegrityScanner::new(Arc::new(source), registry_with("Local", adapter));

        let report = scanner.scan(&ScanOptions::default()).await.unwrap();

        assert_eq!(report.checked, 3);
        assert_eq!(report.missing, 1);
        assert_eq!(report.findings[0].path().as_str(), "docs/other.pdf ");
    }

    #[tokio::test]
    async fn test_scan_accepts_opaque_ids() {
        let adapter = MemoryAdapter::with_paths(["old/c3.pdf"]);
        let source = MemoryRecordSource::new(vec![
            stored("legacy id 7", "Local", "old/c3.pdf"),
            stored("dept/42", "Local", "old/d4.pdf"),
        ]);
        let scanner = IntegrityScanner::new(Arc::new(source), registry_with("Local", adapter));

        let report = scanner.scan(&ScanOptions::default()).await.unwrap();

        assert_eq!(report.checked, 2);
        assert_eq!(report.missing, 1);
        assert_eq!(report.findings[0].id(), "dept/42");
    }

    #[tokio::test]
    async fn test_missing_file_warning_names_adapter_and_path() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = MemoryRecordSource::new(vec![stored("a1", "Local", "docs/report.pdf")]);
        let scanner =
            IntegrityScanner::new(Arc::new(source), registry_with("Local", MemoryAdapter::new()));
        scanner.scan(&ScanOptions::default()).await.unwrap();

        let logs = logs.contents();
        let warning = logs
            .lines()
            .find(|line| line.contains("WARN"))
            .unwrap_or_default();
        assert!(warning.contains("a1 file does not exist (adapter: Local, path: docs/report.pdf)"));
    }
}
