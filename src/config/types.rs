//! Configuration type definitions
//!
//! This module contains the configuration structures for the servers a
//! downloader connects to and the process-wide TLS policy switches.

use crate::types::{
    ConnectionCount, HostName, Password, Port, ServerName, ServerTimeout, Username, VerifyLevel,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Process-wide settings
    #[serde(default)]
    pub global: GlobalSettings,
    /// List of NNTP servers
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl Config {
    /// Look up a server by its configured name
    #[must_use]
    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name.as_str() == name)
    }
}

/// Process-wide settings that apply to every server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalSettings {
    /// Accept the TLS library's minimum protocol version instead of TLS 1.2
    pub allow_legacy_tls: bool,
    /// When false, hostname and certificate checks are forced off for every server
    pub certificate_validation: bool,
    /// Help page appended to certificate error messages
    pub certificate_help_url: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            allow_legacy_tls: false,
            certificate_validation: super::defaults::certificate_validation(),
            certificate_help_url: super::defaults::certificate_help_url(),
        }
    }
}

/// TLS policy for one server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TlsSettings {
    /// Enable TLS for this server
    #[serde(default)]
    pub enabled: bool,
    /// Certificate verification level (0 none, 1 certificate, 2+ certificate and hostname)
    #[serde(default)]
    pub verify: VerifyLevel,
    /// Cipher suite override, which also caps the protocol at TLS 1.2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphers: Option<String>,
    /// Optional path to an extra CA certificate (PEM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,
}

/// Configuration for a single NNTP server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub name: ServerName,
    pub host: HostName,
    /// Port to connect to; defaults to 563 with TLS, 119 without
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Username>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Password>,
    /// Per-server timeout in seconds
    #[serde(default)]
    pub timeout: ServerTimeout,
    /// Number of connection slots opened to this server
    #[serde(default)]
    pub connections: ConnectionCount,
    /// Address to connect to instead of resolving `host` (fastest IP chosen upstream)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    /// Server answers STAT, so prechecks avoid HEAD
    #[serde(default = "super::defaults::supports_capability")]
    pub supports_stat: bool,
    /// Server answers BODY, so full fetches avoid ARTICLE
    #[serde(default = "super::defaults::supports_capability")]
    pub supports_body: bool,
    #[serde(default)]
    pub tls: TlsSettings,
}

impl ServerConfig {
    /// Create a builder for constructing a ServerConfig
    ///
    /// # Examples
    ///
    /// ```
    /// use nntp_conn::config::ServerConfig;
    ///
    /// let config = ServerConfig::builder("news.example.com")
    ///     .name("Example Server")
    ///     .connections(15)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.effective_port().get(), 119);
    /// ```
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ServerConfigBuilder {
        ServerConfigBuilder::new(host)
    }

    /// Configured port, or the conventional one for the TLS setting
    #[must_use]
    pub fn effective_port(&self) -> Port {
        self.port.unwrap_or(Port::default_for(self.tls.enabled))
    }

    /// A username or a password is configured
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }
}

/// Builder for constructing `ServerConfig` instances
///
/// Provides a fluent API for creating server configurations, especially
/// useful in tests.
pub struct ServerConfigBuilder {
    host: String,
    port: Option<u16>,
    name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<std::time::Duration>,
    connections: Option<usize>,
    host_ip: Option<String>,
    supports_stat: bool,
    supports_body: bool,
    tls: TlsSettings,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            name: None,
            username: None,
            password: None,
            timeout: None,
            connections: None,
            host_ip: None,
            supports_stat: true,
            supports_body: true,
            tls: TlsSettings::default(),
        }
    }

    /// Set a friendly name for logging (defaults to "host:port")
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn connections(mut self, count: usize) -> Self {
        self.connections = Some(count);
        self
    }

    #[must_use]
    pub fn host_ip(mut self, ip: impl Into<String>) -> Self {
        self.host_ip = Some(ip.into());
        self
    }

    #[must_use]
    pub fn supports_stat(mut self, supported: bool) -> Self {
        self.supports_stat = supported;
        self
    }

    #[must_use]
    pub fn supports_body(mut self, supported: bool) -> Self {
        self.supports_body = supported;
        self
    }

    /// Enable TLS for this server
    #[must_use]
    pub fn tls(mut self, enabled: bool) -> Self {
        self.tls.enabled = enabled;
        self
    }

    #[must_use]
    pub fn verify(mut self, level: VerifyLevel) -> Self {
        self.tls.verify = level;
        self
    }

    #[must_use]
    pub fn ciphers(mut self, ciphers: impl Into<String>) -> Self {
        self.tls.ciphers = Some(ciphers.into());
        self
    }

    #[must_use]
    pub fn cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls.cert_path = Some(path.into());
        self
    }

    /// Build the ServerConfig
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Host is empty or invalid
    /// - Port is 0 (when explicitly set)
    /// - Name is empty (when explicitly set)
    /// - Credentials are empty or contain line breaks
    /// - Timeout or connection count is 0 (when explicitly set)
    pub fn build(self) -> Result<ServerConfig, anyhow::Error> {
        let host = HostName::new(self.host.clone())?;

        let port = self
            .port
            .map(|p| {
                Port::new(p).ok_or_else(|| anyhow::anyhow!("Invalid port: {} (must be 1-65535)", p))
            })
            .transpose()?;

        let name_str = self.name.unwrap_or_else(|| {
            let port = port.unwrap_or(Port::default_for(self.tls.enabled));
            format!("{}:{}", self.host, port)
        });
        let name = ServerName::new(name_str)?;

        let connections = match self.connections {
            Some(n) => ConnectionCount::new(n)
                .ok_or_else(|| anyhow::anyhow!("Invalid connections: {} (must be > 0)", n))?,
            None => ConnectionCount::default(),
        };

        let timeout = match self.timeout {
            Some(t) => ServerTimeout::new(t)?,
            None => ServerTimeout::default(),
        };

        Ok(ServerConfig {
            name,
            host,
            port,
            username: self.username.map(Username::new).transpose()?,
            password: self.password.map(Password::new).transpose()?,
            timeout,
            connections,
            host_ip: self.host_ip,
            supports_stat: self.supports_stat,
            supports_body: self.supports_body,
            tls: self.tls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let config = ServerConfig::builder("news.example.com").build().unwrap();
        assert_eq!(config.name.as_str(), "news.example.com:119");
        assert_eq!(config.effective_port(), Port::NNTP);
        assert_eq!(config.timeout, ServerTimeout::DEFAULT);
        assert_eq!(config.connections.get(), 8);
        assert!(config.supports_stat);
        assert!(config.supports_body);
        assert!(!config.has_credentials());
        assert!(!config.tls.enabled);
        assert_eq!(config.tls.verify, VerifyLevel::STRICT);
    }

    #[test]
    fn test_builder_tls_default_port() {
        let config = ServerConfig::builder("secure.example.com")
            .tls(true)
            .build()
            .unwrap();
        assert_eq!(config.effective_port(), Port::NNTPS);
        assert_eq!(config.name.as_str(), "secure.example.com:563");
    }

    #[test]
    fn test_builder_full() {
        let config = ServerConfig::builder("secure.example.com")
            .name("Secure")
            .port(443)
            .username("user")
            .password("pass")
            .timeout(Duration::from_secs(30))
            .connections(20)
            .host_ip("192.0.2.7")
            .supports_stat(false)
            .tls(true)
            .verify(VerifyLevel::CERTIFICATE)
            .ciphers("TLS13_AES_256_GCM_SHA384")
            .build()
            .unwrap();
        assert_eq!(config.effective_port().get(), 443);
        assert!(config.has_credentials());
        assert_eq!(config.timeout.as_secs(), 30);
        assert_eq!(config.connections.get(), 20);
        assert_eq!(config.host_ip.as_deref(), Some("192.0.2.7"));
        assert!(!config.supports_stat);
        assert_eq!(config.tls.verify, VerifyLevel::CERTIFICATE);
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(ServerConfig::builder("").build().is_err());
        assert!(ServerConfig::builder("h").port(0).build().is_err());
        assert!(ServerConfig::builder("h").connections(0).build().is_err());
        assert!(
            ServerConfig::builder("h")
                .timeout(Duration::ZERO)
                .build()
                .is_err()
        );
        assert!(
            ServerConfig::builder("h")
                .username("a\r\nQUIT")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_config_lookup_by_name() {
        let config = Config {
            servers: vec![
                ServerConfig::builder("a.example").name("a").build().unwrap(),
                ServerConfig::builder("b.example").name("b").build().unwrap(),
            ],
            ..Default::default()
        };
        assert_eq!(config.server("b").unwrap().host.as_str(), "b.example");
        assert!(config.server("c").is_none());
    }
}
