//! Protocol-related type-safe wrappers for NNTP primitives

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// An article message identifier as supplied by the job model
///
/// Stored without angle brackets; command builders wrap it exactly once.
/// A single enclosing `<...>` pair is stripped on construction.
///
/// # Examples
/// ```
/// use nntp_conn::types::MessageId;
///
/// let id = MessageId::new("part1of3.abc@news.example.com").unwrap();
/// assert_eq!(id.as_str(), "part1of3.abc@news.example.com");
/// assert_eq!(id.bracketed(), "<part1of3.abc@news.example.com>");
///
/// let wrapped = MessageId::new("<abc@example>").unwrap();
/// assert_eq!(wrapped.as_str(), "abc@example");
///
/// assert!(MessageId::new("has space@example").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Create a message ID, stripping one pair of enclosing angle brackets
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let s = s.as_ref();
        let inner = s
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(s);

        if inner.is_empty() {
            return Err(ValidationError::InvalidMessageId("empty".to_string()));
        }
        if inner
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
        {
            return Err(ValidationError::InvalidMessageId(s.to_string()));
        }
        Ok(Self(inner.to_string()))
    }

    /// The identifier without brackets
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier in wire form, `<id>`
    #[must_use]
    pub fn bracketed(&self) -> String {
        format!("<{}>", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}
