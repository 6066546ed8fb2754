//! Path Builder
//!
//! Derives where a stored file lives from the record that describes it. Given a
//! [`FileRecord`](filestore_types::FileRecord) and a [`PathBuilderConfig`], the builder
//! produces:
//!
//! - the directory path relative to the adapter root,
//! - the stored filename,
//! - the full path (directory + filename),
//! - a URL form of the full path that always uses forward slashes.
//!
//! ## Layout
//!
//! With the default configuration, a record with id `3fa85f64-5717-4562-b3fc-2c963f66afa6`
//! and extension `png` lands at:
//!
//! ```text
//! 07/                                         # sha1(id)[2..4]
//! └── 3e/                                     # sha1(id)[4..6]
//!     └── d7/                                 # sha1(id)[6..8]
//!         └── 3fa85f6457174562b3fc2c963f66afa6/
//!             └── 3fa85f6457174562b3fc2c963f66afa6.png
//! ```
//!
//! Hashing the identifier into fixed-width directory levels keeps the number of entries per
//! directory bounded no matter how many files are stored.
//!
//! ## Stability
//!
//! Derived paths are persisted with the record and never recomputed. Every sharding strategy
//! must therefore produce byte-identical output for the lifetime of the data it laid out,
//! including the quirks of the legacy layouts (see [`shard`]).
//!
//! ## Example Usage
//!
//! ```
//! use filestore_paths::{PathBuilder, PathBuilderConfig};
//! use filestore_types::{FileRecord, NonEmptyText, RecordId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PathBuilderConfig {
//!     separator: '/',
//!     ..PathBuilderConfig::default()
//! };
//! let builder = PathBuilder::with_default_strategies(config)?;
//!
//! let record = FileRecord::new(
//!     RecordId::parse("3fa85f64-5717-4562-b3fc-2c963f66afa6")?,
//!     NonEmptyText::new("Local")?,
//! )
//! .with_extension(NonEmptyText::new("png")?);
//!
//! assert_eq!(
//!     builder.full_path(&record, None)?,
//!     "07/3e/d7/3fa85f6457174562b3fc2c963f66afa6/3fa85f6457174562b3fc2c963f66afa6.png"
//! );
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod constants;
pub mod shard;
mod slash;

pub use builder::{split_filename, PathBuilder};
pub use config::{PathBuilderConfig, PathBuilderOverrides, ShardingMethod};
pub use constants::{
    CRC32_SIGNED_STRATEGY, CRC32_STRATEGY, DEFAULT_SHARD_DEPTH, NO_SHARDING, SHA1_MAX_DEPTH,
    SHA1_STRATEGY,
};
pub use filestore_uuid::strip_dashes;
pub use shard::{ShardFn, ShardRegistry};
pub use slash::{ensure_slash, SlashPosition};

/// Errors that can occur while deriving a path.
///
/// All of these are configuration or input problems. They fail the single computation
/// that hit them and are never silently replaced by a fallback path.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// `ensure_slash` position is not `before`, `after` or `both`
    #[error("Invalid position `{0}`")]
    InvalidPosition(String),

    /// Sharding method name has no registered strategy
    #[error("Unknown sharding strategy `{name}` (registered: {registered})")]
    UnknownShardStrategy { name: String, registered: String },

    /// Strategy cannot produce the requested number of levels
    #[error("Sharding strategy `{strategy}` supports at most {max} levels, got {depth}")]
    InvalidShardDepth {
        strategy: String,
        depth: usize,
        max: usize,
    },

    /// Model folder is enabled but the record has no model
    #[error("Record {0} has no model but the model folder is enabled")]
    MissingModel(String),

    /// Original filename is preserved but the record has none
    #[error("Record {0} has no original filename to preserve")]
    MissingFilename(String),
}

/// Result type for path derivation.
pub type PathResult<T> = Result<T, PathError>;
