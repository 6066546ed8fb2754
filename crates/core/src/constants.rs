//! Constants used throughout the filestore core crate.

/// Environment variable naming the YAML configuration file.
pub const CONFIG_ENV_VAR: &str = "FILESTORE_CONFIG";

/// Environment variable naming the root of the default `Local` adapter.
pub const ROOT_ENV_VAR: &str = "FILESTORE_ROOT";

/// Configuration file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "filestore.yaml";

/// Root of the default `Local` adapter when neither a config file nor `FILESTORE_ROOT` is set.
pub const DEFAULT_LOCAL_ROOT: &str = "files";
