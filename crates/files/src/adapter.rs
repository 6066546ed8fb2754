//! Storage adapters and the name → adapter registry.
//!
//! An adapter answers one question for the scanner: does a file exist at this stored path?
//! Adapters for remote backends are usually network-bound, which is why the check is async.

use crate::{AdapterError, FilesError, FilesResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A backend holding stored files.
#[async_trait]
pub trait StorageAdapter: Send + Sync + fmt::Debug {
    /// Returns whether a file exists at `path`.
    ///
    /// `Ok(false)` is a confirmed absence. An `Err` means the adapter could not tell.
    async fn has(&self, path: &str) -> Result<bool, AdapterError>;
}

/// Adapter for files on the local filesystem, relative to a root directory.
///
/// Stored paths may use either `/` or `\` as separator and may carry a leading separator;
/// both are interpreted relative to the root. Paths that would escape the root are rejected.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    root: PathBuf,
}

impl LocalAdapter {
    /// Creates an adapter rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if `root` does not exist, is not a
    /// directory, or cannot be canonicalised.
    pub fn new(root: &Path) -> FilesResult<Self> {
        if !root.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root.display()
            )));
        }

        if !root.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        let root = root.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a stored path onto the filesystem under the root.
    fn resolve(&self, stored: &str) -> Result<PathBuf, AdapterError> {
        let mut resolved = self.root.clone();
        let mut segments = 0usize;

        for segment in stored.split(['/', '\\']).filter(|s| !s.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => resolved.push(part),
                (Some(Component::CurDir), None) => continue,
                _ => {
                    return Err(AdapterError::InvalidPath(format!(
                        "'{}' escapes the adapter root",
                        stored
                    )))
                }
            }
            segments += 1;
        }

        if segments == 0 {
            return Err(AdapterError::InvalidPath(format!(
                "'{}' does not name a file",
                stored
            )));
        }

        Ok(resolved)
    }
}

#[async_trait]
impl StorageAdapter for LocalAdapter {
    async fn has(&self, path: &str) -> Result<bool, AdapterError> {
        let full = self.resolve(path)?;

        match tokio::fs::metadata(&full).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AdapterError::Io {
                path: full.display().to_string(),
                source: e,
            }),
        }
    }
}

/// In-memory adapter holding a set of paths.
///
/// Useful for embedding and tests; paths registered with [`MemoryAdapter::fail_on`] report a
/// backend error instead of an answer.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    paths: RwLock<HashSet<String>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter that already holds `paths`.
    pub fn with_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let adapter = Self::new();
        for path in paths {
            adapter.insert(path);
        }
        adapter
    }

    pub fn insert(&self, path: impl Into<String>) {
        self.paths.write().insert(path.into());
    }

    pub fn remove(&self, path: &str) -> bool {
        self.paths.write().remove(path)
    }

    /// Makes every check of `path` fail with a backend error.
    pub fn fail_on(&self, path: impl Into<String>) {
        self.failing.write().insert(path.into());
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    async fn has(&self, path: &str) -> Result<bool, AdapterError> {
        if self.failing.read().contains(path) {
            return Err(AdapterError::Backend(format!(
                "simulated failure for {}",
                path
            )));
        }
        Ok(self.paths.read().contains(path))
    }
}

/// Adapters by name.
///
/// Built once at startup and then shared read-only with the scanner.
#[derive(Debug, Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn StorageAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` under `name`, returning the adapter it replaced, if any.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        adapter: Arc<dyn StorageAdapter>,
    ) -> Option<Arc<dyn StorageAdapter>> {
        self.adapters.insert(name.into(), adapter)
    }

    /// Looks up an adapter by name.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::UnknownAdapter`] if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> FilesResult<Arc<dyn StorageAdapter>> {
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| FilesError::UnknownAdapter {
                name: name.to_string(),
                registered: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
