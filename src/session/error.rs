//! Session error types

use std::fmt;
use thiserror::Error;

use crate::connection_error::ConnectionError;

/// A reply that ends the session: the server refused service or login
///
/// The caller must tear the connection down with a hard reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermanentProtocolError {
    pub code: u16,
    pub message: String,
}

impl fmt::Display for PermanentProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PermanentProtocolError {}

/// Errors that can occur while driving a session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Server rejected the session during the handshake
    #[error("permanent protocol error {code}: {message}", code = .0.code, message = .0.message)]
    Permanent(#[from] PermanentProtocolError),

    /// The server closed the connection (zero-byte read)
    #[error("server closed connection")]
    TransportClosed,

    /// No live connection to talk to
    #[error("not connected")]
    NotConnected,

    /// `request_article` called without an assigned article
    #[error("no article assigned")]
    NoArticle,

    /// Socket read or write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connect phase failed
    #[error(transparent)]
    Connect(#[from] ConnectionError),
}

impl SessionError {
    /// The session must be discarded with a hard reset
    ///
    /// Everything except a missing article assignment leaves the
    /// connection unusable.
    #[must_use]
    pub const fn requires_hard_reset(&self) -> bool {
        !matches!(self, Self::NoArticle)
    }

    /// Reply code of a permanent protocol error
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Permanent(err) => Some(err.code),
            _ => None,
        }
    }
}
