//! Validated domain types
//!
//! Newtypes here enforce their invariants at construction time, so the
//! connection and session layers never re-check hostnames, credentials,
//! ports or message identifiers.

pub mod config;
pub mod protocol;
pub mod validated;

pub use config::{ConnectionCount, Port, ServerTimeout, VerifyLevel};
pub use protocol::MessageId;
pub use validated::{HostName, Password, ServerName, Username, ValidationError};
