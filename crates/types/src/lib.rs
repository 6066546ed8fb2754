//! Shared value types for the file storage layer.
//!
//! - [`NonEmptyText`] guards names against empty input.
//! - [`StoredPath`] carries a persisted path verbatim.
//! - [`FileRecord`] describes a file as the path builder sees it.
//! - [`StoredFile`] is the persisted `{id, adapter, path}` tuple the integrity scanner checks.

mod record;

pub use filestore_uuid::RecordId;
pub use record::{FileRecord, StoredFile};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// Adapter and model names are carried as `NonEmptyText`: an empty adapter name can never
/// resolve.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NonEmptyText::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A path exactly as it was persisted.
///
/// Unlike [`NonEmptyText`] the input is never trimmed or normalised: integrity checks must look
/// up the stored value byte for byte. Only the empty string is rejected, since it would make an
/// existence check look at the adapter root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoredPath(String);

impl StoredPath {
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if `input` is the empty string.
    pub fn new(input: impl Into<String>) -> Result<Self, TextError> {
        let path = input.into();
        if path.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoredPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoredPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for StoredPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for StoredPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StoredPath::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims() {
        let text = NonEmptyText::new("  Local  ").unwrap();
        assert_eq!(text.as_str(), "Local");
        assert_eq!(text.to_string(), "Local");
    }

    #[test]
    fn test_non_empty_text_rejects_blank() {
        assert!(matches!(NonEmptyText::new(""), Err(TextError::Empty)));
        assert!(matches!(NonEmptyText::new(" \t\n"), Err(TextError::Empty)));
    }

    #[test]
    fn test_non_empty_text_deserialize_rejects_blank() {
        let result: Result<NonEmptyText, _> = serde_json::from_str("\"   \"");
        assert!(result.is_err());
    }

    #[test]
    fn test_non_empty_text_into_inner() {
        let text: NonEmptyText = "S3".parse().unwrap();
        assert_eq!(text.into_inner(), "S3");
    }

    #[test]
    fn test_stored_path_kept_verbatim() {
        let path = StoredPath::new(" docs/report.pdf ").unwrap();
        assert_eq!(path.as_str(), " docs/report.pdf ");

        let path: StoredPath = serde_json::from_str("\"a/b.png\\t\"").unwrap();
        assert_eq!(path.as_str(), "a/b.png\t");
    }

    #[test]
    fn test_stored_path_rejects_empty_only() {
        assert!(matches!(StoredPath::new(""), Err(TextError::Empty)));
        assert!(StoredPath::new(" ").is_ok());
        assert!(serde_json::from_str::<StoredPath>("\"\"").is_err());
    }
}
