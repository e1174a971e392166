//! Configuration loading from files and environment variables
//!
//! Credentials may be supplied through the environment so they stay out of
//! the config file in container deployments.

use anyhow::{Context, Result};
use std::path::Path;

use super::types::Config;
use crate::types::{Password, Username};

/// Apply per-server credential overrides
///
/// Indexed by position in the `servers` list:
/// - `NNTP_SERVER_N_USERNAME` - Server authentication username
/// - `NNTP_SERVER_N_PASSWORD` - Server authentication password
fn apply_credential_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    for (index, server) in config.servers.iter_mut().enumerate() {
        if let Some(username) = lookup(&format!("NNTP_SERVER_{}_USERNAME", index)) {
            server.username = Some(
                Username::new(username)
                    .with_context(|| format!("NNTP_SERVER_{}_USERNAME is invalid", index))?,
            );
            tracing::debug!("Server '{}' username taken from environment", server.name);
        }
        if let Some(password) = lookup(&format!("NNTP_SERVER_{}_PASSWORD", index)) {
            server.password = Some(
                Password::new(password)
                    .with_context(|| format!("NNTP_SERVER_{}_PASSWORD is invalid", index))?,
            );
            tracing::debug!("Server '{}' password taken from environment", server.name);
        }
    }
    Ok(())
}

/// Parse configuration from TOML text and validate it
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file, with environment credential overrides
pub fn load_config(config_path: impl AsRef<Path>) -> Result<Config> {
    let path = config_path.as_ref();
    let config_content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    let mut config: Config = toml::from_str(&config_content)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

    apply_credential_overrides(&mut config, |key| std::env::var(key).ok())?;

    config.validate()?;

    tracing::info!(
        "Loaded {} server(s) from {}",
        config.servers.len(),
        path.display()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Port, VerifyLevel};
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
[global]
certificate_validation = true

[[servers]]
name = "primary"
host = "news.example.com"
username = "user"
password = "secret"
timeout = 30

[servers.tls]
enabled = true
verify = 1

[[servers]]
name = "backup"
host = "backup.example.com"
port = 8119
supports_stat = false
"#;

    #[test]
    fn test_parse_config_with_defaults() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.servers.len(), 2);

        let primary = &config.servers[0];
        assert_eq!(primary.effective_port(), Port::NNTPS);
        assert_eq!(primary.timeout.as_secs(), 30);
        assert_eq!(primary.tls.verify, VerifyLevel::CERTIFICATE);
        assert!(primary.has_credentials());

        let backup = &config.servers[1];
        assert_eq!(backup.effective_port().get(), 8119);
        assert_eq!(backup.timeout.as_secs(), 60);
        assert_eq!(backup.connections.get(), 8);
        assert!(!backup.supports_stat);
        assert!(backup.supports_body);
        assert!(!backup.tls.enabled);

        assert!(!config.global.allow_legacy_tls);
        assert_eq!(
            config.global.certificate_help_url,
            crate::constants::message::CERTIFICATE_HELP_URL
        );
    }

    #[test]
    fn test_parse_config_rejects_bad_values() {
        assert!(parse_config("[[servers]]\nname = \"a\"\nhost = \"\"\n").is_err());
        assert!(parse_config("[[servers]]\nname = \"a\"\nhost = \"h\"\ntimeout = 0\n").is_err());
        assert!(
            parse_config("[[servers]]\nname = \"a\"\nhost = \"h\"\n[servers.tls]\nverify = 7\n")
                .is_err()
        );
        assert!(parse_config("").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.servers[0].name.as_str(), "primary");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/nntp-conn.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_credential_overrides() {
        let mut config = parse_config(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("NNTP_SERVER_1_USERNAME", "envuser"),
            ("NNTP_SERVER_1_PASSWORD", "envpass"),
        ]
        .into_iter()
        .collect();

        apply_credential_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        let backup = &config.servers[1];
        assert_eq!(backup.username.as_ref().unwrap().as_str(), "envuser");
        assert_eq!(backup.password.as_ref().unwrap().as_str(), "envpass");
        assert_eq!(
            config.servers[0].username.as_ref().unwrap().as_str(),
            "user"
        );
    }

    #[test]
    fn test_credential_override_rejects_line_break() {
        let mut config = parse_config(SAMPLE).unwrap();
        let result = apply_credential_overrides(&mut config, |k| {
            (k == "NNTP_SERVER_0_USERNAME").then(|| "bad\nname".to_string())
        });
        assert!(result.is_err());
    }
}
