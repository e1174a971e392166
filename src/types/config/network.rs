//! Network-related configuration types

use std::num::NonZeroU16;
use std::str::FromStr;

use crate::types::ValidationError;

nonzero_newtype! {
    /// A validated network port number that cannot be zero
    ///
    /// # Examples
    /// ```
    /// use nntp_conn::types::Port;
    ///
    /// let port = Port::new(119).unwrap();
    /// assert_eq!(port.get(), 119);
    /// assert!(Port::new(0).is_none());
    /// assert_eq!(Port::NNTPS.get(), 563);
    /// ```
    #[doc(alias = "tcp_port")]
    pub struct Port(NonZeroU16: u16, serialize as serialize_u16);
}

impl Port {
    /// NNTP port (119)
    pub const NNTP: Self = Self(NonZeroU16::new(119).unwrap());

    /// NNTPS port (563)
    pub const NNTPS: Self = Self(NonZeroU16::new(563).unwrap());

    /// Conventional port for a server with or without TLS
    #[must_use]
    pub const fn default_for(tls: bool) -> Self {
        if tls { Self::NNTPS } else { Self::NNTP }
    }
}

impl FromStr for Port {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let port = s.parse::<u16>().map_err(|_| ValidationError::InvalidPort)?;
        Self::new(port).ok_or(ValidationError::InvalidPort)
    }
}

impl TryFrom<u16> for Port {
    type Error = ValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ValidationError::InvalidPort)
    }
}
