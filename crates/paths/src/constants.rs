//! Names and limits shared by the path builder and its configuration.

/// Registry name of the SHA-1 sharding strategy (the default).
pub const SHA1_STRATEGY: &str = "sha1";

/// Registry name of the legacy CRC-32 sharding strategy.
pub const CRC32_STRATEGY: &str = "crc32";

/// Registry name of the CRC-32 strategy with the checksum read as a signed 32-bit integer.
pub const CRC32_SIGNED_STRATEGY: &str = "crc32-signed";

/// Configuration value that disables sharded directories.
pub const NO_SHARDING: &str = "none";

/// Number of shard levels inserted by `path` unless configured otherwise.
pub const DEFAULT_SHARD_DEPTH: usize = 3;

/// Deepest SHA-1 layout: 40 hex characters, the first two skipped, two per level.
pub const SHA1_MAX_DEPTH: usize = 19;
