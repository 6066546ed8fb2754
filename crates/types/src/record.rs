use crate::{NonEmptyText, StoredPath};
use filestore_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Metadata describing one file in the storage layer.
///
/// This is the input of path derivation. `path` is filled in once the file has been written
/// and is never recomputed from the other fields afterwards: path builder configuration may
/// change over time, and older files must stay where they were put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Opaque identifier; also the hash input for sharded directories.
    pub id: RecordId,

    /// Logical model or category the file belongs to (used by the model folder option).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<NonEmptyText>,

    /// Original filename as uploaded, including its extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<NonEmptyText>,

    /// Original extension without the leading dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<NonEmptyText>,

    /// Name of the adapter that owns the bytes.
    #[serde(alias = "adapterName")]
    pub adapter: NonEmptyText,

    /// Path persisted at write time.
    #[serde(default, alias = "storedPath", skip_serializing_if = "Option::is_none")]
    pub path: Option<StoredPath>,
}

impl FileRecord {
    /// Creates a record that has not been written yet.
    pub fn new(id: RecordId, adapter: NonEmptyText) -> Self {
        Self {
            id,
            model: None,
            filename: None,
            extension: None,
            adapter,
            path: None,
        }
    }

    pub fn with_model(mut self, model: NonEmptyText) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_filename(mut self, filename: NonEmptyText) -> Self {
        self.filename = Some(filename);
        self
    }

    pub fn with_extension(mut self, extension: NonEmptyText) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Records the path the file was written to.
    pub fn with_path(mut self, path: StoredPath) -> Self {
        self.path = Some(path);
        self
    }

    /// Returns the scanner view of this record, or `None` if it was never written.
    pub fn stored(&self) -> Option<StoredFile> {
        self.path.as_ref().map(|path| StoredFile {
            id: self.id.to_string(),
            model: self.model.clone(),
            adapter: self.adapter.clone(),
            path: path.clone(),
        })
    }
}

/// The persisted location of a file: which adapter holds it and under which path.
///
/// Record sources yield this tuple; the integrity scanner checks `path` against the adapter
/// named by `adapter` exactly as stored.
///
/// `id` is an opaque token here. Rows written by older systems may carry ids that
/// [`RecordId::parse`] would refuse, and the scanner only reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<NonEmptyText>,

    #[serde(alias = "adapterName")]
    pub adapter: NonEmptyText,

    #[serde(alias = "storedPath")]
    pub path: StoredPath,
}

impl StoredFile {
    pub fn new(id: impl Into<String>, adapter: NonEmptyText, path: StoredPath) -> Self {
        Self {
            id: id.into(),
            model: None,
            adapter,
            path,
        }
    }

    pub fn with_model(mut self, model: NonEmptyText) -> Self {
        self.model = Some(model);
        self
    }
}
