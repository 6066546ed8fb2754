//! Record identifiers.
//!
//! Every stored file is keyed by an identifier that the path builder turns into a filename
//! stem, a per-record folder and the input of the shard hash. In practice these are
//! hyphenated UUIDs (`3fa85f64-5717-4562-b3fc-2c963f66afa6`), but the storage layer treats
//! them as opaque tokens: whatever identifier a record was written with must keep producing
//! the same path forever.
//!
//! This crate provides:
//! - [`RecordId`], a validated wrapper that guarantees the identifier is safe to embed in a
//!   path (non-empty, no whitespace, no path separators).
//! - Generation of fresh identifiers for newly ingested files.
//! - The dash-stripping rule used for filename stems and id folders.
//!
//! ## Dash stripping
//!
//! `3fa85f64-5717-4562-b3fc-2c963f66afa6` becomes `3fa85f6457174562b3fc2c963f66afa6`.
//! Only `-` is removed; any other character is kept verbatim.

mod service;

pub use service::{strip_dashes, RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
