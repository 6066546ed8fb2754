//! Record sources feed stored-file records to the scanner one page at a time.

use crate::SourceError;
use async_trait::async_trait;
use filestore_types::StoredFile;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;

/// Paginated access to stored-file records.
///
/// `page` may return fewer than `limit` records; an empty page means there is nothing left.
/// Implementations do not need to be stable under concurrent modification: the scanner stops
/// on the first empty page, not on the count it saw at the start.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Total number of records the source expects to yield.
    async fn count(&self) -> Result<u64, SourceError>;

    /// Returns up to `limit` records starting at `offset`.
    async fn page(&self, offset: u64, limit: usize) -> Result<Vec<StoredFile>, SourceError>;
}

/// Restricts which records a source yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Only records whose model equals this identifier.
    pub model: Option<String>,
    /// Only records owned by this adapter.
    pub adapter: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &StoredFile) -> bool {
        let model_matches = match &self.model {
            Some(model) => record.model.as_ref().map(|m| m.as_str()) == Some(model.as_str()),
            None => true,
        };
        let adapter_matches = match &self.adapter {
            Some(adapter) => record.adapter.as_str() == adapter,
            None => true,
        };
        model_matches && adapter_matches
    }
}

fn slice_page(records: &[StoredFile], offset: u64, limit: usize) -> Vec<StoredFile> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(records.len());
    let end = start.saturating_add(limit).min(records.len());
    records[start..end].to_vec()
}

/// In-memory record source.
///
/// Records can be removed while a scan is running, which makes it useful for exercising
/// the scanner against a shrinking record set.
#[derive(Debug, Default)]
pub struct MemoryRecordSource {
    records: RwLock<Vec<StoredFile>>,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<StoredFile>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn push(&self, record: StoredFile) {
        self.records.write().push(record);
    }

    /// Removes every record with the given id; returns how many were removed.
    pub fn remove(&self, id: &str) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn count(&self) -> Result<u64, SourceError> {
        Ok(self.records.read().len() as u64)
    }

    async fn page(&self, offset: u64, limit: usize) -> Result<Vec<StoredFile>, SourceError> {
        Ok(slice_page(&self.records.read(), offset, limit))
    }
}

/// Record source backed by a manifest file exported from the file table.
///
/// The manifest is a JSON or YAML array of stored-file rows:
///
/// ```yaml
/// - id: 3fa85f64-5717-4562-b3fc-2c963f66afa6
///   model: Documents
///   adapter: Local
///   path: 07/3e/d7/3fa85f6457174562b3fc2c963f66afa6/3fa85f6457174562b3fc2c963f66afa6.pdf
/// ```
///
/// The format is chosen by file extension (`.json`, `.yaml`, `.yml`). The filter is applied
/// once at load time, so counts and pages only ever see matching rows.
///
/// Rows are decoded one at a time. A row that does not decode (no adapter, empty path, ...)
/// is logged, kept in [`ManifestRecordSource::rejected`] and skipped; the rest still load.
#[derive(Debug)]
pub struct ManifestRecordSource {
    records: Vec<StoredFile>,
    rejected: Vec<RejectedRow>,
}

/// A manifest row that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// Zero-based position in the manifest.
    pub index: usize,
    pub reason: String,
}

fn decode_rows<V, E>(
    rows: Vec<V>,
    decode: impl Fn(V) -> Result<StoredFile, E>,
) -> (Vec<StoredFile>, Vec<RejectedRow>)
where
    E: std::fmt::Display,
{
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        match decode(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(row = index, "skipping manifest row: {}", e);
                rejected.push(RejectedRow {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }

    (records, rejected)
}

impl ManifestRecordSource {
    /// Loads and filters a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read, has an unsupported extension, or
    /// is not a list of rows. Individual bad rows do not fail the load.
    pub async fn open(path: &Path, filter: RecordFilter) -> Result<Self, SourceError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Io {
                path: path.display().to_string(),
                source: e,
            })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let (records, rejected) = Self::parse(&content, &extension)?;
        let total = records.len();
        let records: Vec<StoredFile> = records.into_iter().filter(|r| filter.matches(r)).collect();

        tracing::debug!(
            manifest = %path.display(),
            total,
            matching = records.len(),
            rejected = rejected.len(),
            "loaded record manifest"
        );

        Ok(Self { records, rejected })
    }

    fn parse(
        content: &str,
        extension: &str,
    ) -> Result<(Vec<StoredFile>, Vec<RejectedRow>), SourceError> {
        match extension {
            "json" => {
                let rows: Vec<serde_json::Value> = serde_json::from_str(content)?;
                Ok(decode_rows(rows, serde_json::from_value))
            }
            "yaml" | "yml" => {
                let rows: Vec<serde_yaml::Value> = serde_yaml::from_str(content)?;
                Ok(decode_rows(rows, serde_yaml::from_value))
            }
            other => Err(SourceError::UnsupportedFormat(format!(
                "'.{}' (expected .json, .yaml or .yml)",
                other
            ))),
        }
    }

    pub fn records(&self) -> &[StoredFile] {
        &self.records
    }

    /// Rows skipped because they did not decode.
    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }
}

#[async_trait]
impl RecordSource for ManifestRecordSource {
    async fn count(&self) -> Result<u64, SourceError> {
        Ok(self.records.len() as u64)
    }

    async fn page(&self, offset: u64, limit: usize) -> Result<Vec<StoredFile>, SourceError> {
        Ok(slice_page(&self.records, offset, limit))
    }
}
