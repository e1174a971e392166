//! NNTP response inspection
//!
//! Per [RFC 3977 §3.2](https://datatracker.ietf.org/doc/html/rfc3977#section-3.2):
//! ```text
//! response     = status-line [CRLF multiline-data]
//! status-line  = status-code SP status-text CRLF
//! status-code  = 3DIGIT
//! ```
//!
//! Per [RFC 3977 §3.4.1](https://datatracker.ietf.org/doc/html/rfc3977#section-3.4.1),
//! multiline responses end with a line containing a single period, which
//! appears in the data stream as `\r\n.\r\n`.

/// Multiline response terminator: "\r\n.\r\n" (RFC 3977)
pub const MULTILINE_TERMINATOR: &[u8] = b"\r\n.\r\n";

/// Line ending: "\r\n"
pub const CRLF: &[u8] = b"\r\n";

/// Parse a status code from response data
///
/// Responses begin with a 3-digit status code (ASCII digits '0'-'9').
/// Returns `None` until three bytes are present or when they are not digits.
///
/// **Optimization**: Direct byte-to-digit conversion without UTF-8 validation.
#[inline]
pub fn parse_status_code(data: &[u8]) -> Option<u16> {
    if data.len() < 3 {
        return None;
    }

    let d0 = data[0].wrapping_sub(b'0');
    let d1 = data[1].wrapping_sub(b'0');
    let d2 = data[2].wrapping_sub(b'0');

    if d0 > 9 || d1 > 9 || d2 > 9 {
        return None;
    }

    Some((d0 as u16) * 100 + (d1 as u16) * 10 + (d2 as u16))
}

/// Check if data ends with the NNTP multiline terminator
///
/// **Optimization**: Single suffix check, no scanning. Dot-stuffing
/// guarantees a body line holding a lone "." is sent as "..", so this
/// tail can only be the real terminator.
#[inline]
pub fn has_terminator_at_end(data: &[u8]) -> bool {
    data.ends_with(MULTILINE_TERMINATOR)
}

/// Check whether at least one complete line (status line) has arrived
#[inline]
pub fn has_complete_line(data: &[u8]) -> bool {
    data.windows(CRLF.len()).any(|w| w == CRLF)
}

/// Decode a response for display or error messages
///
/// Invalid UTF-8 (binary article data, Latin-1 greetings) is replaced
/// rather than rejected; surrounding whitespace and line endings are trimmed.
pub fn decode_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim().to_string()
}
