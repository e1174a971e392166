//! NNTP command construction helpers
//!
//! This module provides functions for constructing well-formed NNTP commands
//! according to RFC 3977 and RFC 4643. Every builder returns a complete,
//! CRLF-terminated line ready to be written to the socket.

use crate::types::MessageId;

/// QUIT command (RFC 3977 Section 5.4)
pub const QUIT: &[u8] = b"QUIT\r\n";

/// Construct AUTHINFO USER command (RFC 4643 Section 2.3)
#[inline]
pub fn authinfo_user(username: &str) -> String {
    format!("AUTHINFO USER {}\r\n", username)
}

/// Construct AUTHINFO PASS command (RFC 4643 Section 2.3)
#[inline]
pub fn authinfo_pass(password: &str) -> String {
    format!("AUTHINFO PASS {}\r\n", password)
}

/// Construct GROUP command (RFC 3977 Section 6.1.1)
#[inline]
pub fn group(name: &str) -> String {
    format!("GROUP {}\r\n", name)
}

/// Construct ARTICLE command with message-ID (RFC 3977 Section 6.2.1)
#[inline]
pub fn article_by_msgid(msgid: &MessageId) -> String {
    format!("ARTICLE {}\r\n", msgid)
}

/// Construct BODY command with message-ID (RFC 3977 Section 6.2.3)
#[inline]
pub fn body_by_msgid(msgid: &MessageId) -> String {
    format!("BODY {}\r\n", msgid)
}

/// Construct HEAD command with message-ID (RFC 3977 Section 6.2.2)
#[inline]
pub fn head_by_msgid(msgid: &MessageId) -> String {
    format!("HEAD {}\r\n", msgid)
}

/// Construct STAT command with message-ID (RFC 3977 Section 6.2.4)
#[inline]
pub fn stat_by_msgid(msgid: &MessageId) -> String {
    format!("STAT {}\r\n", msgid)
}
