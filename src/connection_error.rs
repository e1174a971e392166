//! Connection error types for the NNTP connection core
//!
//! This module provides detailed error types for the connect phase (address
//! lookup, socket setup, TCP connect, TLS handshake) and the classification
//! that turns raw transport failures into operator-facing messages.

use std::fmt;
use std::time::Duration;

use crate::constants::message;

/// Errors that can occur while establishing a connection
#[derive(Debug)]
#[non_exhaustive]
pub enum ConnectionError {
    /// The server profile has no cached address-resolution result
    AddressUnavailable { server: String },

    /// DNS resolution failed
    DnsResolution {
        address: String,
        source: std::io::Error,
    },

    /// Socket configuration failed (buffer sizes, keepalive, etc.)
    SocketConfig {
        operation: String,
        source: std::io::Error,
    },

    /// TCP connection failed
    TcpConnect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// TCP connect or TLS handshake did not finish within the server timeout
    Timeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    /// TLS client configuration could not be built
    TlsConfig { server: String, reason: String },

    /// TLS handshake failed
    TlsHandshake {
        server: String,
        source: std::io::Error,
    },

    /// The connect task ended without reporting a result
    Cancelled,

    /// A classified failure, ready to be shown to an operator
    Failed(ConnectFailure),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressUnavailable { .. } => f.write_str(message::ADDRESS_UNAVAILABLE),
            Self::DnsResolution { address, source } => {
                write!(f, "Failed to resolve DNS for {}: {}", address, source)
            }
            Self::SocketConfig { operation, source } => {
                write!(f, "Failed to configure socket ({}): {}", operation, source)
            }
            Self::TcpConnect { host, port, source } => {
                write!(f, "Failed to connect to {}:{}: {}", host, port, source)
            }
            Self::Timeout {
                host,
                port,
                timeout,
            } => {
                write!(
                    f,
                    "Connection to {}:{} timed out after {}s",
                    host,
                    port,
                    timeout.as_secs()
                )
            }
            Self::TlsConfig { server, reason } => {
                write!(f, "Invalid TLS configuration for '{}': {}", server, reason)
            }
            Self::TlsHandshake { server, source } => {
                write!(f, "TLS handshake failed for '{}': {}", server, source)
            }
            Self::Cancelled => f.write_str("Connect task ended without a result"),
            Self::Failed(failure) => write!(f, "{}", failure),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DnsResolution { source, .. } => Some(source),
            Self::SocketConfig { source, .. } => Some(source),
            Self::TcpConnect { source, .. } => Some(source),
            Self::TlsHandshake { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl ConnectionError {
    /// The rustls error behind a failed handshake, if any
    #[must_use]
    pub fn rustls_error(&self) -> Option<&rustls::Error> {
        match self {
            Self::TlsHandshake { source, .. } => source
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<rustls::Error>()),
            _ => None,
        }
    }

    /// Check if this is a certificate verification failure
    #[must_use]
    pub fn is_certificate_error(&self) -> bool {
        match self {
            Self::Failed(failure) => failure.kind.is_certificate(),
            _ => matches!(self.rustls_error(), Some(rustls::Error::InvalidCertificate(_))),
        }
    }

    /// Check if this is a network connectivity error
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::TcpConnect { .. }
                | Self::DnsResolution { .. }
                | Self::AddressUnavailable { .. }
                | Self::Timeout { .. }
        )
    }

    /// Check if this is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Get the appropriate log level for this error
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        match self {
            // Aborted by a hard reset, nothing went wrong
            Self::Cancelled => tracing::Level::DEBUG,
            // Configuration errors need attention
            Self::TlsConfig { .. } => tracing::Level::ERROR,
            Self::Failed(failure) if failure.kind.is_certificate() => tracing::Level::ERROR,
            _ if self.is_certificate_error() => tracing::Level::ERROR,
            // Network errors might be transient
            _ => tracing::Level::WARN,
        }
    }

    /// Innermost human-readable description, without our own prefixes
    fn detail(&self) -> String {
        match self {
            Self::TcpConnect { source, .. } | Self::TlsHandshake { source, .. } => {
                match self.rustls_error() {
                    Some(err) => err.to_string(),
                    None => source.to_string(),
                }
            }
            Self::SocketConfig { source, .. } | Self::DnsResolution { source, .. } => {
                source.to_string()
            }
            Self::Timeout { .. } => "timed out".to_string(),
            other => other.to_string(),
        }
    }
}

/// Category of a connect-phase failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A TLS handshake was answered by a plaintext service
    SslNotSupported,
    /// The certificate does not list the server hostname
    HostnameMismatch,
    /// The certificate chain could not be verified
    UntrustedCertificate,
    /// Anything else: refused, unreachable, timed out, reset
    Generic,
}

impl FailureKind {
    #[must_use]
    pub const fn is_certificate(self) -> bool {
        matches!(self, Self::HostnameMismatch | Self::UntrustedCertificate)
    }
}

/// Handshake failure signatures of servers that speak plaintext on the port
const SSL_NOT_SUPPORTED_SIGNATURES: &[&str] = &[
    "SSL23_GET_SERVER_HELLO",
    "SSL3_GET_RECORD",
    "wrong version number",
    "InvalidContentType",
    "corrupt message",
];

/// A classified connect failure with its operator-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl ConnectFailure {
    /// Translate a raw connect error into a category and a readable message
    ///
    /// Certificate errors are rewritten to name the server and carry a link to
    /// `help_url`; a plaintext service answering a TLS handshake gets a fixed
    /// message; everything else keeps its own description.
    pub fn classify(error: &ConnectionError, host: &str, help_url: &str) -> Self {
        if let ConnectionError::Failed(failure) = error {
            return failure.clone();
        }

        let raw = error.detail();

        if let Some(rustls::Error::InvalidCertificate(cert_error)) = error.rustls_error() {
            let (kind, reason) = if crate::tls::is_name_mismatch(cert_error) {
                (FailureKind::HostnameMismatch, message::CERT_HOSTNAME_MISMATCH)
            } else {
                (FailureKind::UntrustedCertificate, message::CERT_NOT_VALID)
            };
            return Self {
                kind,
                message: format!(
                    "Server {} uses an untrusted certificate [{}] - Wiki: {}",
                    host, reason, help_url
                ),
            };
        }

        let plaintext_reply = matches!(
            error.rustls_error(),
            Some(rustls::Error::InvalidMessage(_))
        ) || SSL_NOT_SUPPORTED_SIGNATURES
            .iter()
            .any(|sig| raw.contains(sig));

        if plaintext_reply {
            return Self {
                kind: FailureKind::SslNotSupported,
                message: message::SSL_NOT_SUPPORTED.to_string(),
            };
        }

        Self {
            kind: FailureKind::Generic,
            message: raw,
        }
    }
}
