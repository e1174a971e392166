//! Validated string types that enforce invariants at construction time

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Validation errors for string and configuration types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("hostname cannot be empty or whitespace")]
    EmptyHostName,

    #[error("server name cannot be empty or whitespace")]
    EmptyServerName,

    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("credentials cannot contain line breaks")]
    CredentialLineBreak,

    #[error("port cannot be 0")]
    InvalidPort,

    #[error("invalid message ID: {0}")]
    InvalidMessageId(String),

    #[error("invalid verify level {0} (expected 0-3)")]
    InvalidVerifyLevel(u8),

    #[error("timeout cannot be 0")]
    ZeroTimeout,
}

/// Macro to generate validated string newtypes.
///
/// Each type gets a validating `new()`, `as_str()`, `AsRef<str>`, `Deref`,
/// `TryFrom<String>` and serde impls that run the same validation.
/// `Display` is left to the caller so secrets can be redacted.
macro_rules! validated_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident(String) {
            validation: |$s_param:ident| $validation:expr,
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", stringify!($name), " after validation")]
            pub fn new($s_param: String) -> Result<Self, ValidationError> {
                let validate = || $validation;
                validate()?;
                Ok(Self($s_param))
            }

            #[doc = concat!("Get the ", stringify!($name), " as a string slice")]
            #[must_use]
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from($s_param: String) -> Result<Self, Self::Error> {
                Self::new($s_param)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

fn reject_line_breaks(s: &str) -> Result<(), ValidationError> {
    if s.contains(['\r', '\n']) {
        Err(ValidationError::CredentialLineBreak)
    } else {
        Ok(())
    }
}

validated_string! {
    /// A validated hostname that cannot be empty or whitespace-only
    ///
    /// # Examples
    /// ```
    /// use nntp_conn::types::HostName;
    ///
    /// let host = HostName::new("news.example.com".to_string()).unwrap();
    /// assert_eq!(host.as_str(), "news.example.com");
    ///
    /// assert!(HostName::new("".to_string()).is_err());
    /// assert!(HostName::new("   ".to_string()).is_err());
    /// ```
    #[doc(alias = "host")]
    pub struct HostName(String) {
        validation: |s| {
            if s.trim().is_empty() {
                Err(ValidationError::EmptyHostName)
            } else {
                Ok(())
            }
        },
    }
}

validated_string! {
    /// A validated server name used in logs and configuration lookups
    pub struct ServerName(String) {
        validation: |s| {
            if s.trim().is_empty() {
                Err(ValidationError::EmptyServerName)
            } else {
                Ok(())
            }
        },
    }
}

validated_string! {
    /// Username sent with `AUTHINFO USER`
    ///
    /// Line breaks are rejected because the value is written verbatim
    /// into a CRLF-terminated command.
    pub struct Username(String) {
        validation: |s| {
            if s.is_empty() {
                return Err(ValidationError::EmptyUsername);
            }
            reject_line_breaks(&s)
        },
    }
}

validated_string! {
    /// Password sent with `AUTHINFO PASS`
    ///
    /// May be empty; some servers only check the username. `Debug` and
    /// `Display` never reveal the value.
    pub struct Password(String) {
        validation: |s| reject_line_breaks(&s),
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostName").field(&self.0).finish()
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServerName").field(&self.0).finish()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Username").field(&self.0).finish()
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(********)")
    }
}
