//! Constants used throughout the connection core
//!
//! This module centralizes magic numbers and operator-facing strings
//! so the session, connection and TLS layers agree on them.

use std::time::Duration;

/// Receive buffer sizing
///
/// A session buffer must hold a complete multi-line response. Articles on
/// Usenet are typically 500-800KB, so the initial capacity covers nearly all
/// of them and growth stays rare.
pub mod buffer {
    /// Page size for memory alignment (4KB = standard OS page)
    const PAGE_SIZE: usize = 4096;

    /// Initial receive buffer capacity (800KB)
    pub const INITIAL: usize = 800 * 1024;

    /// Amount the receive buffer grows by when it is full
    pub const GROWTH: usize = INITIAL;

    const _: () = assert!(
        INITIAL.is_multiple_of(PAGE_SIZE),
        "INITIAL must be page-aligned"
    );
}

/// Socket tuning
pub mod socket {
    use super::Duration;

    /// TCP socket receive buffer size (4MB)
    pub const RECV_BUFFER: usize = 4 * 1024 * 1024;

    /// Idle time before the kernel starts sending keepalive probes
    pub const KEEPALIVE_IDLE: Duration = Duration::from_secs(60);
}

/// Timing constants for the session lifecycle
pub mod timeout {
    use super::Duration;

    /// Default per-server timeout
    pub const DEFAULT_SERVER: Duration = Duration::from_secs(60);

    /// Cooldown after a hard reset for routine (non-error) reasons
    pub const ROUTINE_RESET_COOLDOWN: Duration = Duration::from_secs(5);

    /// Pause after sending QUIT so the command can leave the socket before close
    pub const QUIT_FLUSH: Duration = Duration::from_millis(10);
}

/// Operator-facing messages
pub mod message {
    /// Reported when no address-resolution result is available for a server
    pub const ADDRESS_UNAVAILABLE: &str =
        "Address not available - Check for internet or DNS problems";

    /// Reported when a plaintext port answered a TLS handshake
    pub const SSL_NOT_SUPPORTED: &str = "This server does not allow SSL on this port";

    /// Hostname not listed in the certificate
    pub const CERT_HOSTNAME_MISMATCH: &str = "Certificate hostname mismatch: the server hostname is not listed in the certificate. This is a server issue.";

    /// Generic certificate validation failure
    pub const CERT_NOT_VALID: &str = "Certificate not valid. This is most probably a server issue.";

    /// Default help page appended to certificate errors
    pub const CERTIFICATE_HELP_URL: &str = "https://sabnzbd.org/certificate-errors";
}
