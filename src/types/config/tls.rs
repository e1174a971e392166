//! Certificate verification level

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::ValidationError;

/// How strictly a server's TLS certificate is checked
///
/// - `0`: no certificate validation at all
/// - `1`: the certificate chain must be trusted, the hostname is not checked
/// - `2` and `3`: chain and hostname are both verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VerifyLevel(u8);

impl VerifyLevel {
    pub const NONE: Self = Self(0);
    pub const CERTIFICATE: Self = Self(1);
    pub const STRICT: Self = Self(2);

    pub fn new(level: u8) -> Result<Self, ValidationError> {
        if level > 3 {
            Err(ValidationError::InvalidVerifyLevel(level))
        } else {
            Ok(Self(level))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Hostname verification is on only for level 2 and above
    #[must_use]
    pub const fn verifies_hostname(self) -> bool {
        self.0 >= 2
    }

    /// Certificate validation is skipped entirely only at level 0
    #[must_use]
    pub const fn verifies_certificate(self) -> bool {
        self.0 > 0
    }
}

impl Default for VerifyLevel {
    fn default() -> Self {
        Self::STRICT
    }
}

impl<'de> Deserialize<'de> for VerifyLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level = u8::deserialize(deserializer)?;
        Self::new(level).map_err(serde::de::Error::custom)
    }
}
