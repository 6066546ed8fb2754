//! Internal implementation of record identifiers.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Removes every `-` from `input`.
///
/// This is the rule applied to identifiers before they are used as filename stems or
/// per-record folder names.
pub fn strip_dashes(input: &str) -> String {
    input.replace('-', "")
}

/// An opaque record identifier that is safe to embed in a storage path.
///
/// The identifier is kept exactly as supplied: no case folding and no normalisation of
/// hyphens. Stored paths were derived from the identifier as it was at write time, so any
/// rewriting here would silently move files.
///
/// # Construction
/// - [`RecordId::generate`] allocates a fresh hyphenated v4 UUID (for new files).
/// - [`RecordId::parse`] validates an externally supplied identifier.
///
/// # Errors
/// [`RecordId::parse`] returns [`UuidError::InvalidInput`] if the input is empty, contains
/// whitespace, or contains a path separator (`/` or `\`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RecordId(String);

impl Default for RecordId {
    fn default() -> Self {
        Self::generate()
    }
}

impl RecordId {
    /// Generates a new identifier in hyphenated UUID v4 form.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Validates and wraps an identifier.
    ///
    /// # Arguments
    ///
    /// * `input` - Identifier as stored alongside the file record.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` cannot be embedded in a path.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if input.is_empty() {
            return Err(UuidError::InvalidInput(
                "record id cannot be empty".to_string(),
            ));
        }

        if input.chars().any(char::is_whitespace) {
            return Err(UuidError::InvalidInput(format!(
                "record id must not contain whitespace, got: '{}'",
                input
            )));
        }

        if input.contains('/') || input.contains('\\') {
            return Err(UuidError::InvalidInput(format!(
                "record id must not contain path separators, got: '{}'",
                input
            )));
        }

        Ok(Self(input.to_owned()))
    }

    /// Returns the identifier exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier with all dashes removed.
    pub fn stripped(&self) -> String {
        strip_dashes(&self.0)
    }

    /// Returns true if the dash-stripped identifier consists only of hex digits.
    ///
    /// Hash-based sharding works on any identifier, but layouts inherited from UUID
    /// primary keys assume this holds.
    pub fn is_hex_like(&self) -> bool {
        self.0
            .bytes()
            .filter(|b| *b != b'-')
            .all(|b| b.is_ascii_hexdigit())
    }

    /// Returns the identifier as a `uuid::Uuid` if it is UUID-shaped.
    pub fn as_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.0).ok()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.hyphenated().to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_hyphenated_uuid() {
        let id = RecordId::generate();

        assert_eq!(id.as_str().len(), 36);
        assert_eq!(id.as_str().matches('-').count(), 4);
        assert!(id.as_uuid().is_some());
        assert!(id.is_hex_like());
    }

    #[test]
    fn test_generate_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[test]
    fn test_parse_keeps_input_verbatim() {
        let id = RecordId::parse("3FA85F64-5717-4562-B3FC-2C963F66AFA6").unwrap();

        assert_eq!(id.to_string(), "3FA85F64-5717-4562-B3FC-2C963F66AFA6");
    }

    #[test]
    fn test_parse_accepts_non_uuid_tokens() {
        let id = RecordId::parse("invoice_2024.0001").unwrap();

        assert_eq!(id.as_str(), "invoice_2024.0001");
        assert!(id.as_uuid().is_none());
        assert!(!id.is_hex_like());
    }

    #[test]
    fn test_parse_rejects_empty() {
        let result = RecordId::parse("");

        match result {
            Err(UuidError::InvalidInput(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_parse_rejects_whitespace() {
        assert!(RecordId::parse("abc def").is_err());
        assert!(RecordId::parse(" abc").is_err());
        assert!(RecordId::parse("abc\n").is_err());
    }

    #[test]
    fn test_parse_rejects_separators() {
        assert!(RecordId::parse("../etc/passwd").is_err());
        assert!(RecordId::parse("a\\b").is_err());
    }

    #[test]
    fn test_stripped() {
        let id = RecordId::parse("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap();

        assert_eq!(id.stripped(), "3fa85f6457174562b3fc2c963f66afa6");
    }

    #[test]
    fn test_strip_dashes_only_removes_dashes() {
        assert_eq!(strip_dashes("a-b_c.d--e"), "ab_c.de");
        assert_eq!(strip_dashes(""), "");
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::parse_str("550e8400e29b41d4a716446655440000").unwrap();
        let id = RecordId::from(uuid);

        assert_eq!(id.as_str(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_from_str() {
        let id: RecordId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(id.stripped(), "550e8400e29b41d4a716446655440000");

        let invalid: Result<RecordId, _> = "has space".parse();
        assert!(invalid.is_err());
    }

    #[test]
    fn test_serde_round_trip_is_transparent() {
        let id = RecordId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");

        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let result: Result<RecordId, _> = serde_json::from_str("\"a/b\"");
        assert!(result.is_err());
    }
}
