//! Path builder implementation.
//!
//! [`PathBuilder`] owns a validated [`PathBuilderConfig`] and a shared [`ShardRegistry`].
//! Every operation is a pure function of the record, the config and the optional per-call
//! overrides: nothing touches the filesystem and nothing mutates the builder.
//!
//! # Path construction
//!
//! ```text
//! [path_prefix/][model/][shard/shard/shard/][stripped-id/][path_suffix/]
//! ```
//!
//! Each bracketed part is optional. The result always ends with the separator, so the full
//! path is a plain concatenation of path and filename.
//!
//! # Filename construction
//!
//! Derived mode (default):
//! `[file_prefix]<id or stripped id>[file_suffix][.extension]`
//!
//! Preserved mode (`preserve_original_filename`):
//! `[file_prefix]<original name>[file_suffix inserted before the last extension]`

use crate::config::{PathBuilderConfig, PathBuilderOverrides, ShardingMethod};
use crate::shard::ShardRegistry;
use crate::slash::{ensure_slash, SlashPosition};
use crate::{PathError, PathResult};
use filestore_types::FileRecord;
use std::borrow::Cow;
use std::sync::Arc;

/// Splits `filename` at its last `.` into name and extension.
///
/// With `keep_dot` the extension includes the dot. A name without a dot has an empty
/// extension.
///
/// ```
/// use filestore_paths::split_filename;
///
/// assert_eq!(split_filename("report.tar.gz", false), ("report.tar", "gz"));
/// assert_eq!(split_filename("report.PDF", true), ("report", ".PDF"));
/// assert_eq!(split_filename("README", true), ("README", ""));
/// ```
pub fn split_filename(filename: &str, keep_dot: bool) -> (&str, &str) {
    match filename.rfind('.') {
        Some(position) => {
            let extension = if keep_dot {
                &filename[position..]
            } else {
                &filename[position + 1..]
            };
            (&filename[..position], extension)
        }
        None => (filename, ""),
    }
}

/// Derives storage paths, filenames and URLs for file records.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    config: PathBuilderConfig,
    registry: Arc<ShardRegistry>,
}

impl PathBuilder {
    /// Creates a builder from a config and a strategy registry.
    ///
    /// The configured sharding method is resolved here, so an unknown strategy name or an
    /// unsupported depth is reported at startup rather than on the first upload.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::UnknownShardStrategy`] or [`PathError::InvalidShardDepth`].
    pub fn new(config: PathBuilderConfig, registry: Arc<ShardRegistry>) -> PathResult<Self> {
        validate_sharding(&config, &registry)?;

        tracing::debug!(
            sharding_method = %config.sharding_method,
            shard_depth = config.shard_depth,
            "path builder configured"
        );

        Ok(Self { config, registry })
    }

    /// Creates a builder that only knows the built-in strategies.
    pub fn with_default_strategies(config: PathBuilderConfig) -> PathResult<Self> {
        Self::new(config, Arc::new(ShardRegistry::with_builtins()))
    }

    pub fn config(&self) -> &PathBuilderConfig {
        &self.config
    }

    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    /// Builds the directory path for `record`, ending with the separator.
    ///
    /// # Errors
    ///
    /// - [`PathError::MissingModel`] if the model folder is enabled and the record has no model.
    /// - Sharding errors if the overrides select an unknown strategy or unsupported depth.
    pub fn path(
        &self,
        record: &FileRecord,
        overrides: Option<&PathBuilderOverrides>,
    ) -> PathResult<String> {
        let config = self.effective(overrides)?;
        self.path_with(record, &config)
    }

    /// Builds the stored filename for `record`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::MissingFilename`] in preserved mode when the record has no
    /// original filename.
    pub fn filename(
        &self,
        record: &FileRecord,
        overrides: Option<&PathBuilderOverrides>,
    ) -> PathResult<String> {
        let config = self.effective(overrides)?;
        filename_with(record, &config)
    }

    /// Returns path and filename joined.
    pub fn full_path(
        &self,
        record: &FileRecord,
        overrides: Option<&PathBuilderOverrides>,
    ) -> PathResult<String> {
        let config = self.effective(overrides)?;
        let mut full = self.path_with(record, &config)?;
        full.push_str(&filename_with(record, &config)?);
        Ok(full)
    }

    /// Returns the full path with every backslash turned into a forward slash.
    ///
    /// Use this for anything web-facing: the result does not depend on the host separator.
    pub fn url(
        &self,
        record: &FileRecord,
        overrides: Option<&PathBuilderOverrides>,
    ) -> PathResult<String> {
        Ok(self.full_path(record, overrides)?.replace('\\', "/"))
    }

    /// Shards `id` into `depth` directory levels with the named strategy.
    ///
    /// Uses this builder's registry and separator.
    pub fn shard(&self, id: &str, depth: usize, method: &str) -> PathResult<String> {
        self.registry.shard(id, depth, method, self.config.separator)
    }

    fn effective(
        &self,
        overrides: Option<&PathBuilderOverrides>,
    ) -> PathResult<Cow<'_, PathBuilderConfig>> {
        match overrides {
            Some(overrides) if !overrides.is_empty() => {
                let config = self.config.with_overrides(overrides);
                validate_sharding(&config, &self.registry)?;
                Ok(Cow::Owned(config))
            }
            _ => Ok(Cow::Borrowed(&self.config)),
        }
    }

    fn path_with(&self, record: &FileRecord, config: &PathBuilderConfig) -> PathResult<String> {
        let separator = config.separator;
        let mut path = String::new();

        if let Some(prefix) = config.path_prefix() {
            path.push_str(prefix);
            path.push(separator);
        }

        if config.model_folder {
            let model = record
                .model
                .as_ref()
                .ok_or_else(|| PathError::MissingModel(record.id.to_string()))?;
            path.push_str(model.as_str());
            path.push(separator);
        }

        if let ShardingMethod::Strategy(name) = &config.sharding_method {
            path.push_str(&self.registry.shard(
                record.id.as_str(),
                config.shard_depth,
                name,
                separator,
            )?);
        }

        if config.id_shard_folder {
            path.push_str(&record.id.stripped());
            path.push(separator);
        }

        if let Some(suffix) = config.path_suffix() {
            path.push_str(suffix);
            path.push(separator);
        }

        Ok(ensure_slash(&path, SlashPosition::After, Some(separator)))
    }
}

fn validate_sharding(config: &PathBuilderConfig, registry: &ShardRegistry) -> PathResult<()> {
    if let ShardingMethod::Strategy(name) = &config.sharding_method {
        let strategy = registry.resolve(name)?;
        // Depth limits surface on any input, so probe with an empty id.
        strategy("", config.shard_depth)?;
    }
    Ok(())
}

fn filename_with(record: &FileRecord, config: &PathBuilderConfig) -> PathResult<String> {
    if config.preserve_original_filename {
        preserved_filename(record, config)
    } else {
        derived_filename(record, config)
    }
}

fn derived_filename(record: &FileRecord, config: &PathBuilderConfig) -> PathResult<String> {
    let mut filename = if config.strip_id_dashes {
        record.id.stripped()
    } else {
        record.id.to_string()
    };

    if let Some(suffix) = config.file_suffix() {
        filename.push_str(suffix);
    }

    if config.preserve_extension {
        if let Some(extension) = &record.extension {
            filename.push('.');
            filename.push_str(extension.as_str());
        }
    }

    if let Some(prefix) = config.file_prefix() {
        filename.insert_str(0, prefix);
    }

    Ok(filename)
}

fn preserved_filename(record: &FileRecord, config: &PathBuilderConfig) -> PathResult<String> {
    let original = record
        .filename
        .as_ref()
        .ok_or_else(|| PathError::MissingFilename(record.id.to_string()))?;

    let mut filename = match config.file_prefix() {
        Some(prefix) => format!("{}{}", prefix, original),
        None => original.to_string(),
    };

    if let Some(suffix) = config.file_suffix() {
        let (name, extension) = split_filename(&filename, true);
        let mut suffixed = format!("{}{}", name, suffix);
        if config.preserve_extension {
            suffixed.push_str(extension);
        }
        filename = suffixed;
    }

    Ok(filename)
}
