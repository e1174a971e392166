//! Configuration validation
//!
//! This module provides validation logic for the configuration to ensure
//! all settings are valid before any connection is opened.

use anyhow::Result;
use std::collections::HashSet;

use super::types::{Config, ServerConfig};

impl Config {
    /// Validate configuration for correctness
    ///
    /// Most validations are enforced by the type system (NonZero types,
    /// validated strings, verify level range). This checks the remaining
    /// semantic constraints:
    /// - At least one server configured
    /// - Server names are unique
    /// - A cipher override, when present, names at least one suite
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration must have at least one server"
            ));
        }

        let mut names = HashSet::new();
        for server in &self.servers {
            if !names.insert(server.name.as_str()) {
                return Err(anyhow::anyhow!(
                    "Duplicate server name '{}'",
                    server.name.as_str()
                ));
            }
            validate_server(server)?;
        }

        if !self.global.certificate_validation {
            tracing::warn!(
                "Certificate validation is disabled globally; TLS connections will not be verified"
            );
        }

        Ok(())
    }
}

/// Validate a single server configuration
fn validate_server(server: &ServerConfig) -> Result<()> {
    if let Some(ciphers) = &server.tls.ciphers
        && crate::tls::split_cipher_list(ciphers).next().is_none()
    {
        return Err(anyhow::anyhow!(
            "Server '{}' has an empty cipher list",
            server.name.as_str()
        ));
    }

    if server.tls.ciphers.is_some() && !server.tls.enabled {
        tracing::warn!(
            "Server '{}' sets ciphers but TLS is disabled; the override is ignored",
            server.name.as_str()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str) -> ServerConfig {
        ServerConfig::builder("news.example.com")
            .name(name)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_config_rejected() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = Config {
            servers: vec![server("a"), server("a")],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate server name 'a'"));
    }

    #[test]
    fn test_username_without_password_accepted() {
        let mut s = server("a");
        s.username = Some(crate::types::Username::new("u".into()).unwrap());
        let config = Config {
            servers: vec![s],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.servers[0].has_credentials());
    }

    #[test]
    fn test_blank_cipher_list_rejected() {
        let mut s = server("a");
        s.tls.enabled = true;
        s.tls.ciphers = Some(" : , ".to_string());
        let config = Config {
            servers: vec![s],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_config() {
        let config = Config {
            servers: vec![server("a"), server("b")],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
