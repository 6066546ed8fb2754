use crate::PathError;
use std::fmt;
use std::str::FromStr;

/// Where [`ensure_slash`] guarantees a separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashPosition {
    Before,
    After,
    Both,
}

impl FromStr for SlashPosition {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "both" => Ok(Self::Both),
            other => Err(PathError::InvalidPosition(other.to_string())),
        }
    }
}

impl fmt::Display for SlashPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Both => "both",
        };
        f.write_str(name)
    }
}

/// Ensures `input` starts and/or ends with `separator`.
///
/// A separator is only inserted when it is missing, so applying this twice is the same as
/// applying it once. `separator` defaults to the host path separator.
pub fn ensure_slash(input: &str, position: SlashPosition, separator: Option<char>) -> String {
    let separator = separator.unwrap_or(std::path::MAIN_SEPARATOR);
    let mut output = String::with_capacity(input.len() + 2);

    if matches!(position, SlashPosition::Before | SlashPosition::Both)
        && !input.starts_with(separator)
    {
        output.push(separator);
    }
    output.push_str(input);

    if matches!(position, SlashPosition::After | SlashPosition::Both)
        && !output.ends_with(separator)
    {
        output.push(separator);
    }

    output
}
