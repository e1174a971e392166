//! Address resolution
//!
//! Servers are resolved once and the result is cached on the profile; each
//! connection then picks its socket family from the cached entries.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::connection_error::ConnectionError;

/// Address family of a resolved address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    #[must_use]
    pub const fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::Inet,
            IpAddr::V6(_) => Self::Inet6,
        }
    }

    /// Family forced by a literal IP address, if `target` is one
    #[must_use]
    pub fn of_literal(target: &str) -> Option<Self> {
        target.parse::<IpAddr>().ok().map(|ip| Self::of(&ip))
    }

    #[must_use]
    pub fn domain(self) -> socket2::Domain {
        match self {
            Self::Inet => socket2::Domain::IPV4,
            Self::Inet6 => socket2::Domain::IPV6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inet => "IPv4",
            Self::Inet6 => "IPv6",
        })
    }
}

/// One resolved address: family, socket type, protocol and address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrInfo {
    pub family: AddressFamily,
    pub socket_type: socket2::Type,
    pub protocol: socket2::Protocol,
    pub addr: SocketAddr,
}

impl AddrInfo {
    /// Stream/TCP entry for an address
    #[must_use]
    pub fn tcp(addr: SocketAddr) -> Self {
        Self {
            family: AddressFamily::of(&addr.ip()),
            socket_type: socket2::Type::STREAM,
            protocol: socket2::Protocol::TCP,
            addr,
        }
    }
}

/// Resolve `host:port` into stream/TCP entries, in resolver order
pub async fn resolve(host: &str, port: u16) -> Result<Vec<AddrInfo>, ConnectionError> {
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| ConnectionError::DnsResolution {
            address: format!("{}:{}", host, port),
            source,
        })?;

    let infos: Vec<AddrInfo> = addrs.map(AddrInfo::tcp).collect();
    if infos.is_empty() {
        return Err(ConnectionError::DnsResolution {
            address: format!("{}:{}", host, port),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses returned"),
        });
    }

    tracing::debug!("Resolved {}:{} to {} address(es)", host, port, infos.len());
    Ok(infos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_of_literal() {
        assert_eq!(
            AddressFamily::of_literal("192.0.2.1"),
            Some(AddressFamily::Inet)
        );
        assert_eq!(
            AddressFamily::of_literal("2001:db8::1"),
            Some(AddressFamily::Inet6)
        );
        assert_eq!(AddressFamily::of_literal("news.example.com"), None);
    }

    #[test]
    fn test_tcp_entry() {
        let info = AddrInfo::tcp("[::1]:563".parse().unwrap());
        assert_eq!(info.family, AddressFamily::Inet6);
        assert_eq!(info.socket_type, socket2::Type::STREAM);
        assert_eq!(info.protocol, socket2::Protocol::TCP);
    }

    #[tokio::test]
    async fn test_resolve_localhost_literal() {
        let infos = resolve("127.0.0.1", 119).await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].addr, "127.0.0.1:119".parse().unwrap());
        assert_eq!(infos[0].family, AddressFamily::Inet);
    }

    #[tokio::test]
    async fn test_resolve_failure() {
        let err = resolve("nonexistent.invalid", 119).await.unwrap_err();
        assert!(matches!(err, ConnectionError::DnsResolution { .. }));
    }
}
