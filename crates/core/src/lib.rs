//! # Filestore Core
//!
//! Startup wiring for the filestore tools:
//! - [`CoreConfig`]: YAML configuration resolved once at startup
//! - [`build_registry`]: turns the configured adapters into an [`AdapterRegistry`]
//! - [`build_path_builder`]: a [`PathBuilder`] with the built-in sharding strategies
//!
//! **No CLI concerns**: argument parsing, logging setup and environment variables belong in
//! `filestore-cli`.

pub mod config;
pub mod constants;
mod error;

pub use config::{resolve_config, AdapterConfig, CoreConfig, ScanConfig};
pub use error::{CoreError, CoreResult};

use filestore_files::{AdapterRegistry, LocalAdapter, MemoryAdapter, StorageAdapter};
use filestore_paths::PathBuilder;
use std::sync::Arc;

/// Builds the adapter registry described by `config`.
///
/// # Errors
///
/// Returns [`CoreError::Files`] if a local adapter root is missing or not a directory.
pub fn build_registry(config: &CoreConfig) -> CoreResult<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();

    for (name, adapter) in config.adapters() {
        let adapter: Arc<dyn StorageAdapter> = match adapter {
            AdapterConfig::Local { root } => Arc::new(LocalAdapter::new(root)?),
            AdapterConfig::Memory { paths } => {
                Arc::new(MemoryAdapter::with_paths(paths.iter().cloned()))
            }
        };
        tracing::debug!(adapter = %name, "registered storage adapter");
        registry.register(name.clone(), adapter);
    }

    Ok(registry)
}

/// Builds a path builder from the configured `path_builder` section.
///
/// # Errors
///
/// Returns [`CoreError::Path`] if the configured sharding strategy is unknown or the shard
/// depth is unsupported by it.
pub fn build_path_builder(config: &CoreConfig) -> CoreResult<PathBuilder> {
    Ok(PathBuilder::with_default_strategies(
        config.path_builder().clone(),
    )?)
}
