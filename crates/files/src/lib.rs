//! File Storage Integrity
//!
//! This crate checks that files recorded in the storage layer still exist on the adapter
//! that owns them.
//!
//! ## Design Principles
//!
//! - The scanner only ever asks adapters whether a path exists; it never reads file contents
//! - Stored paths are checked exactly as persisted, never recomputed from configuration
//! - Records are processed one page at a time, so arbitrarily large record sets fit in memory
//! - A problem with one record (unknown adapter, backend failure) never stops the scan
//!
//! ## Components
//!
//! ```text
//! RecordSource ──page(offset, limit)──▶ IntegrityScanner ──has(path)──▶ StorageAdapter
//!                                            │                            ▲
//!                                            └──resolve(name)──▶ AdapterRegistry
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use filestore_files::{
//!     AdapterRegistry, IntegrityScanner, LocalAdapter, ManifestRecordSource, RecordFilter,
//!     ScanOptions,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = AdapterRegistry::new();
//! registry.register("Local", Arc::new(LocalAdapter::new(Path::new("/var/files"))?));
//!
//! let manifest = Path::new("files.json");
//! let source = ManifestRecordSource::open(manifest, RecordFilter::default()).await?;
//! let scanner = IntegrityScanner::new(Arc::new(source), Arc::new(registry));
//!
//! let report = scanner.scan(&ScanOptions::default()).await?;
//! println!("{} checked, {} missing", report.checked, report.missing);
//! # Ok(())
//! # }
//! ```

mod adapter;
mod constants;
mod integrity;
mod source;

pub use adapter::{AdapterRegistry, LocalAdapter, MemoryAdapter, StorageAdapter};
pub use constants::{DEFAULT_ADAPTER_NAME, DEFAULT_PAGE_SIZE};
pub use integrity::{Finding, IntegrityScanner, ScanOptions, ScanReport};
pub use source::{
    ManifestRecordSource, MemoryRecordSource, RecordFilter, RecordSource, RejectedRow,
};

/// Errors raised while setting up adapters.
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// No adapter is registered under this name
    #[error("Unknown adapter `{name}` (registered: {registered})")]
    UnknownAdapter { name: String, registered: String },
}

/// Failure of a single existence check.
///
/// This is distinct from a missing file: the adapter could not tell whether the file exists.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Stored path cannot be resolved safely under the adapter root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// I/O error occurred while checking the path
    #[error("I/O error checking {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend reported a failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors raised by record sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Manifest file could not be read
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Manifest extension is not `.json`, `.yaml` or `.yml`
    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),

    /// Backing store is not reachable
    #[error("Record source unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abort a scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Page size must be at least one record
    #[error("Page size must be greater than zero")]
    InvalidPageSize,

    /// The record source failed; `partial` holds everything checked before the failure.
    #[error("Record source failed after {} record(s): {source}", .partial.checked)]
    RecordSource {
        partial: Box<ScanReport>,
        #[source]
        source: SourceError,
    },
}

/// Result type for adapter setup.
pub type FilesResult<T> = Result<T, FilesError>;
