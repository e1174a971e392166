//! Timeout newtype for the per-server deadline
//!
//! Every deadline a session computes is `now + ServerTimeout`, and the same
//! value bounds TCP connect and the TLS handshake.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

use crate::types::ValidationError;

/// Per-server timeout, serialized as whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerTimeout(Duration);

impl ServerTimeout {
    /// Default server timeout (60 seconds)
    pub const DEFAULT: Self = Self(crate::constants::timeout::DEFAULT_SERVER);

    /// Create a timeout, rejecting zero
    pub fn new(duration: Duration) -> Result<Self, ValidationError> {
        if duration.is_zero() {
            Err(ValidationError::ZeroTimeout)
        } else {
            Ok(Self(duration))
        }
    }

    /// Get the underlying duration
    #[inline]
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// Get timeout in seconds
    #[inline]
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0.as_secs()
    }
}

impl Default for ServerTimeout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<ServerTimeout> for Duration {
    fn from(timeout: ServerTimeout) -> Self {
        timeout.0
    }
}

impl Serialize for ServerTimeout {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0.as_secs())
    }
}

impl<'de> Deserialize<'de> for ServerTimeout {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Self::new(Duration::from_secs(secs)).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sixty_seconds() {
        assert_eq!(ServerTimeout::default().as_secs(), 60);
    }

    #[test]
    fn test_zero_rejected() {
        assert_eq!(
            ServerTimeout::new(Duration::ZERO),
            Err(ValidationError::ZeroTimeout)
        );
    }

    #[test]
    fn test_serde_seconds() {
        let t: ServerTimeout = serde_json::from_str("30").unwrap();
        assert_eq!(t.as_duration(), Duration::from_secs(30));
        assert_eq!(serde_json::to_string(&t).unwrap(), "30");
        assert!(serde_json::from_str::<ServerTimeout>("0").is_err());
    }
}
