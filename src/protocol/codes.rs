//! NNTP status code constants per RFC 3977 and RFC 4643
//!
//! Only the codes the connection core interprets itself, plus the article
//! retrieval replies callers commonly branch on.

// 2xx - Success (RFC 3977 §3.2.1.2)

/// Server ready, posting allowed (RFC 3977 §5.1.1)
pub const POSTING_ALLOWED: u16 = 200;
/// Server ready, no posting (RFC 3977 §5.1.1)
pub const NO_POSTING: u16 = 201;
/// Connection closing (RFC 3977 §5.4)
pub const CONNECTION_CLOSING: u16 = 205;
/// Group selected (RFC 3977 §6.1.1)
pub const GROUP_SELECTED: u16 = 211;
/// Article follows (RFC 3977 §6.2.1)
pub const ARTICLE_FOLLOWS: u16 = 220;
/// Head follows (RFC 3977 §6.2.2)
pub const HEAD_FOLLOWS: u16 = 221;
/// Body follows (RFC 3977 §6.2.3)
pub const BODY_FOLLOWS: u16 = 222;
/// Article exists (RFC 3977 §6.2.4)
pub const ARTICLE_EXISTS: u16 = 223;
/// Authentication accepted (RFC 4643 §2.3)
pub const AUTH_ACCEPTED: u16 = 281;

// 3xx - Continuation (RFC 3977 §3.2.1.3)

/// Password required (RFC 4643 §2.3)
pub const PASSWORD_REQUIRED: u16 = 381;

// 4xx - Temporary errors (RFC 3977 §3.2.1.4)

/// Service temporarily unavailable (RFC 3977 §3.2.1)
pub const SERVICE_UNAVAILABLE: u16 = 400;
/// No such newsgroup (RFC 3977 §6.1.1)
pub const NO_SUCH_GROUP: u16 = 411;
/// No article with that message-id (RFC 3977 §6.2.1)
pub const NO_SUCH_ARTICLE_ID: u16 = 430;
/// Authentication required (RFC 4643 §2.3)
pub const AUTH_REQUIRED: u16 = 480;
/// Authentication rejected (RFC 4643 §2.3)
pub const AUTH_REJECTED: u16 = 481;

// 5xx - Permanent errors (RFC 3977 §3.2.1.5)

/// Command not recognized (RFC 3977 §3.2.1)
pub const COMMAND_NOT_RECOGNIZED: u16 = 500;
/// Access denied / no permission (RFC 3977 §3.2.1)
pub const ACCESS_DENIED: u16 = 502;

/// Replies that abort the authentication handshake outright
///
/// Servers answer a connection they will never serve with one of these,
/// regardless of which handshake step is in flight.
#[inline]
#[must_use]
pub const fn is_fatal_handshake_reply(code: u16) -> bool {
    matches!(
        code,
        SERVICE_UNAVAILABLE | COMMAND_NOT_RECOGNIZED | ACCESS_DENIED
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_2xx_success_range() {
        let codes = [
            POSTING_ALLOWED,
            NO_POSTING,
            CONNECTION_CLOSING,
            GROUP_SELECTED,
            ARTICLE_FOLLOWS,
            HEAD_FOLLOWS,
            BODY_FOLLOWS,
            ARTICLE_EXISTS,
            AUTH_ACCEPTED,
        ];
        for code in codes {
            assert!((200..300).contains(&code), "Code {} should be 2xx", code);
        }
    }

    #[test]
    fn test_auth_code_values() {
        assert_eq!(AUTH_ACCEPTED, 281);
        assert_eq!(PASSWORD_REQUIRED, 381);
        assert_eq!(AUTH_REQUIRED, 480);
        assert_eq!(AUTH_REJECTED, 481);
    }

    #[test]
    fn test_fatal_handshake_replies() {
        assert!(is_fatal_handshake_reply(400));
        assert!(is_fatal_handshake_reply(500));
        assert!(is_fatal_handshake_reply(502));

        assert!(!is_fatal_handshake_reply(AUTH_REQUIRED));
        assert!(!is_fatal_handshake_reply(AUTH_REJECTED));
        assert!(!is_fatal_handshake_reply(POSTING_ALLOWED));
        assert!(!is_fatal_handshake_reply(503));
    }
}
