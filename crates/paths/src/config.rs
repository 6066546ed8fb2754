//! Path builder configuration.
//!
//! [`PathBuilderConfig`] is resolved once (usually from the `path_builder` section of the
//! config file) and handed to the [`PathBuilder`](crate::PathBuilder). Per-call adjustments go
//! through [`PathBuilderOverrides`], which produces a new config and leaves the original
//! untouched.

use crate::constants::{DEFAULT_SHARD_DEPTH, NO_SHARDING, SHA1_STRATEGY};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which sharding strategy builds the intermediate directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShardingMethod {
    /// No shard directories.
    None,
    /// A strategy registered under this name.
    Strategy(String),
}

impl Default for ShardingMethod {
    fn default() -> Self {
        Self::Strategy(SHA1_STRATEGY.to_string())
    }
}

impl From<String> for ShardingMethod {
    fn from(value: String) -> Self {
        if value.is_empty() || value == NO_SHARDING {
            Self::None
        } else {
            Self::Strategy(value)
        }
    }
}

impl From<&str> for ShardingMethod {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ShardingMethod> for String {
    fn from(value: ShardingMethod) -> Self {
        match value {
            ShardingMethod::None => NO_SHARDING.to_string(),
            ShardingMethod::Strategy(name) => name,
        }
    }
}

impl fmt::Display for ShardingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str(NO_SHARDING),
            Self::Strategy(name) => f.write_str(name),
        }
    }
}

/// Controls how paths and filenames are derived from a record.
///
/// Empty strings in the prefix/suffix fields behave exactly like `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathBuilderConfig {
    /// Remove `-` from the id before using it as the filename stem.
    pub strip_id_dashes: bool,
    /// Literal directory placed before everything else.
    pub path_prefix: Option<String>,
    /// Literal directory placed after everything else.
    pub path_suffix: Option<String>,
    /// Literal text placed before the filename.
    pub file_prefix: Option<String>,
    /// Literal text placed after the filename stem.
    pub file_suffix: Option<String>,
    /// Use the record's original filename instead of the id.
    pub preserve_original_filename: bool,
    /// Append the record's extension to a derived filename.
    pub preserve_extension: bool,
    /// Add a folder named after the dash-stripped id.
    pub id_shard_folder: bool,
    pub sharding_method: ShardingMethod,
    /// Number of shard levels.
    pub shard_depth: usize,
    /// Add a folder named after the record's model.
    pub model_folder: bool,
    /// Directory separator used when joining segments.
    pub separator: char,
}

impl Default for PathBuilderConfig {
    fn default() -> Self {
        Self {
            strip_id_dashes: true,
            path_prefix: None,
            path_suffix: None,
            file_prefix: None,
            file_suffix: None,
            preserve_original_filename: false,
            preserve_extension: true,
            id_shard_folder: true,
            sharding_method: ShardingMethod::default(),
            shard_depth: DEFAULT_SHARD_DEPTH,
            model_folder: false,
            separator: std::path::MAIN_SEPARATOR,
        }
    }
}

impl PathBuilderConfig {
    /// Returns a copy of this config with every field set in `overrides` replaced.
    pub fn with_overrides(&self, overrides: &PathBuilderOverrides) -> Self {
        let mut config = self.clone();

        if let Some(value) = overrides.strip_id_dashes {
            config.strip_id_dashes = value;
        }
        if let Some(value) = &overrides.path_prefix {
            config.path_prefix = Some(value.clone());
        }
        if let Some(value) = &overrides.path_suffix {
            config.path_suffix = Some(value.clone());
        }
        if let Some(value) = &overrides.file_prefix {
            config.file_prefix = Some(value.clone());
        }
        if let Some(value) = &overrides.file_suffix {
            config.file_suffix = Some(value.clone());
        }
        if let Some(value) = overrides.preserve_original_filename {
            config.preserve_original_filename = value;
        }
        if let Some(value) = overrides.preserve_extension {
            config.preserve_extension = value;
        }
        if let Some(value) = overrides.id_shard_folder {
            config.id_shard_folder = value;
        }
        if let Some(value) = &overrides.sharding_method {
            config.sharding_method = value.clone();
        }
        if let Some(value) = overrides.shard_depth {
            config.shard_depth = value;
        }
        if let Some(value) = overrides.model_folder {
            config.model_folder = value;
        }
        if let Some(value) = overrides.separator {
            config.separator = value;
        }

        config
    }

    pub(crate) fn path_prefix(&self) -> Option<&str> {
        non_empty(&self.path_prefix)
    }

    pub(crate) fn path_suffix(&self) -> Option<&str> {
        non_empty(&self.path_suffix)
    }

    pub(crate) fn file_prefix(&self) -> Option<&str> {
        non_empty(&self.file_prefix)
    }

    pub(crate) fn file_suffix(&self) -> Option<&str> {
        non_empty(&self.file_suffix)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// A partial [`PathBuilderConfig`]: `None` keeps the base value.
///
/// Setting a prefix or suffix to an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathBuilderOverrides {
    pub strip_id_dashes: Option<bool>,
    pub path_prefix: Option<String>,
    pub path_suffix: Option<String>,
    pub file_prefix: Option<String>,
    pub file_suffix: Option<String>,
    pub preserve_original_filename: Option<bool>,
    pub preserve_extension: Option<bool>,
    pub id_shard_folder: Option<bool>,
    pub sharding_method: Option<ShardingMethod>,
    pub shard_depth: Option<usize>,
    pub model_folder: Option<bool>,
    pub separator: Option<char>,
}

impl PathBuilderOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field is overridden.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn strip_id_dashes(mut self, value: bool) -> Self {
        self.strip_id_dashes = Some(value);
        self
    }

    pub fn path_prefix(mut self, value: impl Into<String>) -> Self {
        self.path_prefix = Some(value.into());
        self
    }

    pub fn path_suffix(mut self, value: impl Into<String>) -> Self {
        self.path_suffix = Some(value.into());
        self
    }

    pub fn file_prefix(mut self, value: impl Into<String>) -> Self {
        self.file_prefix = Some(value.into());
        self
    }

    pub fn file_suffix(mut self, value: impl Into<String>) -> Self {
        self.file_suffix = Some(value.into());
        self
    }

    pub fn preserve_original_filename(mut self, value: bool) -> Self {
        self.preserve_original_filename = Some(value);
        self
    }

    pub fn preserve_extension(mut self, value: bool) -> Self {
        self.preserve_extension = Some(value);
        self
    }

    pub fn id_shard_folder(mut self, value: bool) -> Self {
        self.id_shard_folder = Some(value);
        self
    }

    pub fn sharding_method(mut self, value: impl Into<ShardingMethod>) -> Self {
        self.sharding_method = Some(value.into());
        self
    }

    pub fn shard_depth(mut self, value: usize) -> Self {
        self.shard_depth = Some(value);
        self
    }

    pub fn model_folder(mut self, value: bool) -> Self {
        self.model_folder = Some(value);
        self
    }

    pub fn separator(mut self, value: char) -> Self {
        self.separator = Some(value);
        self
    }
}
