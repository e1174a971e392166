//! NNTP protocol primitives
//!
//! Reply codes, command builders and the byte-level checks the session uses
//! to frame responses.

pub mod codes;
pub mod commands;
mod response;

pub use response::{
    CRLF, MULTILINE_TERMINATOR, decode_text, has_complete_line, has_terminator_at_end,
    parse_status_code,
};
