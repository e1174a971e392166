//! Default values for configuration fields
//!
//! This module centralizes all default value functions used in serde deserialization.

/// Default for capability flags (assume STAT/BODY until the server proves otherwise)
#[inline]
pub fn supports_capability() -> bool {
    true
}

/// Default for process-wide certificate validation (true for security)
#[inline]
pub fn certificate_validation() -> bool {
    true
}

/// Default help page for certificate errors
#[inline]
pub fn certificate_help_url() -> String {
    crate::constants::message::CERTIFICATE_HELP_URL.to_string()
}
