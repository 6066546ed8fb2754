//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the scanner and the
//! path builder. Nothing in this crate reads environment variables; the binary reads them and
//! hands the values to [`resolve_config`].
//!
//! ```yaml
//! adapters:
//!   Local:
//!     kind: local
//!     root: /var/lib/filestore
//! path_builder:
//!   sharding_method: crc32
//!   path_prefix: uploads
//! scan:
//!   page_size: 100
//!   manifest: files.json
//! ```

use crate::constants::{DEFAULT_CONFIG_FILENAME, DEFAULT_LOCAL_ROOT};
use crate::{CoreError, CoreResult};
use filestore_files::{DEFAULT_ADAPTER_NAME, DEFAULT_PAGE_SIZE};
use filestore_paths::PathBuilderConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One configured storage adapter.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum AdapterConfig {
    /// Files on the local filesystem under `root`.
    Local { root: PathBuf },
    /// A fixed set of paths held in memory.
    Memory {
        #[serde(default)]
        paths: Vec<String>,
    },
}

/// Scan settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub page_size: usize,
    /// Existence checks in flight at once; defaults to the page size.
    pub concurrency: Option<usize>,
    /// Record manifest used when the CLI is not given one.
    pub manifest: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: None,
            manifest: None,
        }
    }
}

impl ScanConfig {
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(self.page_size)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    adapters: BTreeMap<String, AdapterConfig>,
    path_builder: PathBuilderConfig,
    scan: ScanConfig,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    adapters: BTreeMap<String, AdapterConfig>,
    path_builder: PathBuilderConfig,
    scan: ScanConfig,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        adapters: BTreeMap<String, AdapterConfig>,
        path_builder: PathBuilderConfig,
        scan: ScanConfig,
    ) -> CoreResult<Self> {
        if adapters.is_empty() {
            return Err(CoreError::InvalidConfig(
                "at least one adapter must be configured".into(),
            ));
        }
        if let Some(name) = adapters.keys().find(|name| name.trim().is_empty()) {
            return Err(CoreError::InvalidConfig(format!(
                "adapter name cannot be empty: {:?}",
                name
            )));
        }
        if scan.page_size == 0 {
            return Err(CoreError::InvalidConfig(
                "scan.page_size must be greater than zero".into(),
            ));
        }
        if scan.concurrency == Some(0) {
            return Err(CoreError::InvalidConfig(
                "scan.concurrency must be greater than zero".into(),
            ));
        }

        Ok(Self {
            adapters,
            path_builder,
            scan,
        })
    }

    /// Configuration used when no config file exists: a single `Local` adapter at `local_root`.
    pub fn with_local_root(local_root: PathBuf) -> Self {
        let mut adapters = BTreeMap::new();
        adapters.insert(
            DEFAULT_ADAPTER_NAME.to_string(),
            AdapterConfig::Local { root: local_root },
        );
        Self {
            adapters,
            path_builder: PathBuilderConfig::default(),
            scan: ScanConfig::default(),
        }
    }

    /// Parses YAML configuration.
    ///
    /// Relative `local` roots and the manifest path are resolved against `base_dir`. A file
    /// with no `adapters` section gets the default `Local` adapter rooted at `files`.
    pub fn from_yaml_str(content: &str, base_dir: &Path) -> CoreResult<Self> {
        let mut file: ConfigFile = serde_yaml::from_str(content)?;

        if file.adapters.is_empty() {
            file.adapters.insert(
                DEFAULT_ADAPTER_NAME.to_string(),
                AdapterConfig::Local {
                    root: PathBuf::from(DEFAULT_LOCAL_ROOT),
                },
            );
        }

        for adapter in file.adapters.values_mut() {
            if let AdapterConfig::Local { root } = adapter {
                if root.is_relative() {
                    *root = base_dir.join(&*root);
                }
            }
        }
        if let Some(manifest) = file.scan.manifest.as_mut() {
            if manifest.is_relative() {
                *manifest = base_dir.join(&*manifest);
            }
        }

        Self::new(file.adapters, file.path_builder, file.scan)
    }

    /// Reads and parses a YAML configuration file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let config = Self::from_yaml_str(&content, base_dir)?;

        tracing::debug!(
            config = %path.display(),
            adapters = config.adapters.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn adapters(&self) -> &BTreeMap<String, AdapterConfig> {
        &self.adapters
    }

    pub fn path_builder(&self) -> &PathBuilderConfig {
        &self.path_builder
    }

    pub fn scan(&self) -> &ScanConfig {
        &self.scan
    }
}

/// Resolve configuration without reading environment variables.
///
/// If `config_path` is provided the file must exist. Otherwise `filestore.yaml` in the current
/// working directory is used when present, and failing that the defaults with a single `Local`
/// adapter rooted at `local_root` (or `files`).
pub fn resolve_config(
    config_path: Option<PathBuf>,
    local_root: Option<PathBuf>,
) -> CoreResult<CoreConfig> {
    if let Some(path) = config_path {
        return CoreConfig::load(&path);
    }

    let cwd_relative = PathBuf::from(DEFAULT_CONFIG_FILENAME);
    if cwd_relative.is_file() {
        return CoreConfig::load(&cwd_relative);
    }

    let root = local_root
        .filter(|root| !root.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_ROOT));
    Ok(CoreConfig::with_local_root(root))
}
