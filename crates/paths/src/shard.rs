//! Sharding strategies.
//!
//! A strategy maps an identifier and a depth to `depth` directory names. Strategies are
//! plain functions registered by name in a [`ShardRegistry`]; the registry is filled once at
//! startup and shared read-only afterwards.
//!
//! # Built-in strategies
//!
//! | name           | segments                                                           |
//! |----------------|--------------------------------------------------------------------|
//! | `sha1`         | hex SHA-1 of the id, 2 characters per level starting at offset 2   |
//! | `crc32`        | decimal CRC-32 of the id, 2 digits per level read from the end     |
//! | `crc32-signed` | as `crc32`, with the checksum read as a signed 32-bit integer      |
//!
//! The SHA-1 layout starts at offset 2, not 0: the first digest byte never contributes to
//! the path. Existing data was laid out this way, so it stays.
//!
//! The CRC-32 layouts are legacy. They pad the decimal checksum on the left with `2 * depth`
//! zeros, then take 2-character windows right to left, reading each window as a leading
//! integer and printing it zero-padded to two digits. For negative checksums a window may
//! contain the sign, which is how `-3` ends up as a directory name.

use crate::constants::{CRC32_SIGNED_STRATEGY, CRC32_STRATEGY, SHA1_MAX_DEPTH, SHA1_STRATEGY};
use crate::{PathError, PathResult};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A sharding strategy: `(id, depth) -> segments`.
///
/// Implementations must be pure. The same input has to produce the same segments for as long
/// as any stored path depends on them.
pub type ShardFn = Arc<dyn Fn(&str, usize) -> PathResult<Vec<String>> + Send + Sync>;

/// Name → strategy lookup.
///
/// Unknown names are rejected with [`PathError::UnknownShardStrategy`] instead of producing
/// an unsharded path.
#[derive(Clone)]
pub struct ShardRegistry {
    strategies: BTreeMap<String, ShardFn>,
}

impl Default for ShardRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ShardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

impl ShardRegistry {
    /// Creates a registry with no strategies at all.
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Creates a registry holding `sha1`, `crc32` and `crc32-signed`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(SHA1_STRATEGY, sha1_segments);
        registry.register(CRC32_STRATEGY, crc32_segments);
        registry.register(CRC32_SIGNED_STRATEGY, crc32_signed_segments);
        registry
    }

    /// Registers `strategy` under `name`, replacing any previous strategy with that name.
    pub fn register<F>(&mut self, name: impl Into<String>, strategy: F) -> &mut Self
    where
        F: Fn(&str, usize) -> PathResult<Vec<String>> + Send + Sync + 'static,
    {
        self.strategies.insert(name.into(), Arc::new(strategy));
        self
    }

    /// Looks up a strategy by name.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::UnknownShardStrategy`] if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> PathResult<ShardFn> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| PathError::UnknownShardStrategy {
                name: name.to_string(),
                registered: self.names().join(", "),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered strategy names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    /// Builds the sharded directory string for `id`.
    ///
    /// Each segment is followed by `separator`, so the result is either empty (depth 0) or
    /// ends with the separator.
    pub fn shard(
        &self,
        id: &str,
        depth: usize,
        method: &str,
        separator: char,
    ) -> PathResult<String> {
        let strategy = self.resolve(method)?;
        let segments = strategy(id, depth)?;
        Ok(join_segments(&segments, separator))
    }
}

fn join_segments(segments: &[String], separator: char) -> String {
    let mut joined = String::with_capacity(segments.len() * 3);
    for segment in segments {
        joined.push_str(segment);
        joined.push(separator);
    }
    joined
}

/// Builds the sharded directory string for `id` with the built-in strategies.
pub fn shard(id: &str, depth: usize, method: &str, separator: char) -> PathResult<String> {
    ShardRegistry::with_builtins().shard(id, depth, method, separator)
}

/// SHA-1 segments: `digest[2..4]`, `digest[4..6]`, … of the lowercase hex digest.
pub fn sha1_segments(id: &str, depth: usize) -> PathResult<Vec<String>> {
    if depth > SHA1_MAX_DEPTH {
        return Err(PathError::InvalidShardDepth {
            strategy: SHA1_STRATEGY.to_string(),
            depth,
            max: SHA1_MAX_DEPTH,
        });
    }

    let digest = hex::encode(Sha1::digest(id.as_bytes()));
    Ok((1..=depth)
        .map(|level| digest[level * 2..level * 2 + 2].to_string())
        .collect())
}

/// CRC-32 segments with the checksum as an unsigned value.
pub fn crc32_segments(id: &str, depth: usize) -> PathResult<Vec<String>> {
    let checksum = crc32fast::hash(id.as_bytes());
    Ok(decimal_windows(i64::from(checksum), depth))
}

/// CRC-32 segments with the checksum reinterpreted as `i32`.
pub fn crc32_signed_segments(id: &str, depth: usize) -> PathResult<Vec<String>> {
    let checksum = crc32fast::hash(id.as_bytes()) as i32;
    Ok(decimal_windows(i64::from(checksum), depth))
}

fn decimal_windows(value: i64, depth: usize) -> Vec<String> {
    let padded = format!("{}{}", "0".repeat(depth * 2), value);
    let len = padded.len();

    (1..=depth)
        .map(|level| {
            let end = len - (level - 1) * 2;
            format!("{:02}", leading_int(&padded[end - 2..end]))
        })
        .collect()
}

/// Reads an optional sign followed by digits; anything else ends the number.
fn leading_int(window: &str) -> i64 {
    let (sign, rest) = match window.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, window.strip_prefix('+').unwrap_or(window)),
    };

    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    sign * digits.parse::<i64>().unwrap_or(0)
}
