//! TLS policy and connector construction for NNTP connections
//!
//! This module turns a server's TLS settings into a rustls client
//! configuration:
//! - Ring crypto provider
//! - Three verification levels: none, certificate chain only, chain and hostname
//! - Optional cipher pinning, which restricts the connection to TLS 1.2
//! - System certificate loading with Mozilla CA bundle fallback
//!
//! The resulting connector is cached on the server profile and shared by
//! every connection to that server.

use crate::config::{GlobalSettings, TlsSettings};
use crate::connection_error::ConnectionError;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::ring;
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, ClientConnection, DigitallySignedStruct, Error as RustlsError,
    ProtocolVersion, RootCertStore, SignatureScheme, SupportedCipherSuite,
    SupportedProtocolVersion,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// Effective TLS policy for one server
///
/// Combines the per-server settings with the process-wide switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPolicy {
    /// Check that the certificate names the server
    pub verify_hostname: bool,
    /// Check the certificate chain against trusted roots
    pub verify_certificate: bool,
    /// Cipher suite override
    pub ciphers: Option<String>,
    /// Accept the library's oldest supported protocol version
    pub allow_legacy: bool,
    /// Extra CA certificate to trust
    pub cert_path: Option<PathBuf>,
}

impl TlsPolicy {
    /// Derive the policy from server settings and global switches
    #[must_use]
    pub fn new(settings: &TlsSettings, global: &GlobalSettings) -> Self {
        let mut verify_hostname = settings.verify.verifies_hostname();
        let mut verify_certificate = settings.verify.verifies_certificate();

        if !global.certificate_validation {
            verify_hostname = false;
            verify_certificate = false;
        }

        Self {
            verify_hostname,
            verify_certificate,
            ciphers: settings.ciphers.clone(),
            allow_legacy: global.allow_legacy_tls,
            cert_path: settings.cert_path.clone(),
        }
    }

    /// Protocol versions the connection may negotiate
    ///
    /// rustls never speaks anything older than TLS 1.2, so the legacy switch
    /// cannot lower the floor; a cipher override caps the range at TLS 1.2
    /// because TLS 1.3 suites are not selectable by name in the same way.
    #[must_use]
    pub fn protocol_versions(&self) -> &'static [&'static SupportedProtocolVersion] {
        static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];
        static TLS12_AND_13: &[&SupportedProtocolVersion] =
            &[&rustls::version::TLS13, &rustls::version::TLS12];

        if self.ciphers.is_some() {
            TLS12_ONLY
        } else {
            TLS12_AND_13
        }
    }
}

/// Split a cipher override into individual suite names
///
/// Accepts `:`, `,` and whitespace as separators (OpenSSL style lists work).
pub fn split_cipher_list(ciphers: &str) -> impl Iterator<Item = &str> {
    ciphers
        .split(|c: char| c == ':' || c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}

/// OpenSSL names for the TLS 1.2 suites the ring provider implements
const OPENSSL_CIPHER_NAMES: &[(&str, &str)] = &[
    (
        "ECDHE-ECDSA-AES256-GCM-SHA384",
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    ),
    (
        "ECDHE-ECDSA-AES128-GCM-SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    ),
    (
        "ECDHE-ECDSA-CHACHA20-POLY1305",
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    ),
    (
        "ECDHE-RSA-AES256-GCM-SHA384",
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    ),
    (
        "ECDHE-RSA-AES128-GCM-SHA256",
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    ),
    (
        "ECDHE-RSA-CHACHA20-POLY1305",
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
    ),
];

fn suite_name(suite: &SupportedCipherSuite) -> String {
    format!("{:?}", suite.suite())
}

/// Select the TLS 1.2 suites named in a cipher override
fn select_cipher_suites(ciphers: &str) -> Vec<SupportedCipherSuite> {
    let wanted: Vec<&str> = split_cipher_list(ciphers)
        .map(|name| {
            OPENSSL_CIPHER_NAMES
                .iter()
                .find(|(openssl, _)| openssl.eq_ignore_ascii_case(name))
                .map_or(name, |(_, iana)| *iana)
        })
        .collect();

    ring::ALL_CIPHER_SUITES
        .iter()
        .filter(|suite| matches!(suite, SupportedCipherSuite::Tls12(_)))
        .filter(|suite| {
            let name = suite_name(suite);
            wanted.iter().any(|w| w.eq_ignore_ascii_case(&name))
        })
        .copied()
        .collect()
}

/// Certificate loading results
#[derive(Debug)]
pub struct CertificateLoadResult {
    pub root_store: RootCertStore,
    pub sources: Vec<String>,
}

/// Load certificates from various sources with fallback chain
fn load_certificates(cert_path: Option<&Path>) -> Result<CertificateLoadResult, String> {
    let mut root_store = RootCertStore::empty();
    let mut sources = Vec::new();

    // 1. Load custom CA certificate if provided
    if let Some(path) = cert_path {
        debug!("TLS: Loading custom CA certificate from: {}", path.display());
        load_custom_certificate(&mut root_store, path)?;
        sources.push("custom certificate".to_string());
    }

    // 2. Try to load system certificates
    let system_count = load_system_certificates(&mut root_store);
    if system_count > 0 {
        debug!(
            "TLS: Loaded {} certificates from system store",
            system_count
        );
        sources.push("system certificates".to_string());
    }

    // 3. Fallback to Mozilla CA bundle if no certificates loaded
    if root_store.is_empty() {
        debug!("TLS: No system certificates available, using Mozilla CA bundle fallback");
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        sources.push("Mozilla CA bundle".to_string());
    }

    Ok(CertificateLoadResult {
        root_store,
        sources,
    })
}

fn load_custom_certificate(root_store: &mut RootCertStore, path: &Path) -> Result<(), String> {
    let cert_data = std::fs::read(path)
        .map_err(|e| format!("Failed to read TLS certificate from {}: {}", path.display(), e))?;

    let certs = rustls_pemfile::certs(&mut cert_data.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Failed to parse TLS certificate: {}", e))?;

    if certs.is_empty() {
        return Err(format!("No certificates found in {}", path.display()));
    }

    for cert in certs {
        root_store
            .add(cert)
            .map_err(|e| format!("Failed to add custom certificate to store: {}", e))?;
    }

    Ok(())
}

/// Load system certificates, returning count of successfully loaded certificates
fn load_system_certificates(root_store: &mut RootCertStore) -> usize {
    let cert_result = rustls_native_certs::load_native_certs();
    let mut added_count = 0;

    for cert in cert_result.certs {
        if root_store.add(cert).is_ok() {
            added_count += 1;
        }
    }

    // Log any errors but don't fail - we have fallback
    for error in cert_result.errors {
        warn!("TLS: Certificate loading error: {}", error);
    }

    added_count
}

/// Verifier that accepts every certificate (verify level 0)
#[derive(Debug)]
struct NoVerifier {
    schemes: Vec<SignatureScheme>,
}

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}

/// Verifier that checks the chain but not the hostname (verify level 1)
///
/// Delegates to the WebPKI verifier and forgives only the
/// "not valid for name" outcome.
#[derive(Debug)]
struct ChainOnlyVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

/// The certificate is fine except that it does not cover the requested name
pub(crate) fn is_name_mismatch(err: &CertificateError) -> bool {
    matches!(
        err,
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
    )
}

impl ServerCertVerifier for ChainOnlyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Err(RustlsError::InvalidCertificate(ref err)) if is_name_mismatch(err) => {
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Build a TLS connector for one server
///
/// Called once per server; the connector is cached on the profile.
pub fn build_connector(server: &str, policy: &TlsPolicy) -> Result<TlsConnector, ConnectionError> {
    let config_error = |reason: String| ConnectionError::TlsConfig {
        server: server.to_string(),
        reason,
    };

    let mut provider = ring::default_provider();
    if let Some(ciphers) = &policy.ciphers {
        let suites = select_cipher_suites(ciphers);
        if suites.is_empty() {
            return Err(config_error(format!(
                "no supported TLS 1.2 cipher suite in '{}'",
                ciphers
            )));
        }
        debug!(
            "TLS: {} pinned to {} cipher suite(s), TLS 1.2 only",
            server,
            suites.len()
        );
        provider.cipher_suites = suites;
    }
    let provider = Arc::new(provider);

    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(policy.protocol_versions())
        .map_err(|e| config_error(e.to_string()))?;

    let client_config = if !policy.verify_certificate {
        warn!(
            "TLS: Certificate verification DISABLED for {} - connections are not authenticated",
            server
        );
        let schemes = provider
            .signature_verification_algorithms
            .supported_schemes();
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier { schemes }))
            .with_no_client_auth()
    } else {
        let certs = load_certificates(policy.cert_path.as_deref()).map_err(config_error)?;
        debug!(
            "TLS: {} trusts certificate sources: {}",
            server,
            certs.sources.join(", ")
        );

        if policy.verify_hostname {
            builder
                .with_root_certificates(certs.root_store)
                .with_no_client_auth()
        } else {
            debug!("TLS: Hostname verification disabled for {}", server);
            let inner = WebPkiServerVerifier::builder_with_provider(
                Arc::new(certs.root_store),
                Arc::clone(&provider),
            )
            .build()
            .map_err(|e| config_error(e.to_string()))?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(ChainOnlyVerifier { inner }))
                .with_no_client_auth()
        }
    };

    Ok(TlsConnector::from(Arc::new(client_config)))
}

/// Name presented to the server in SNI and checked against the certificate
pub fn server_name(host: &str) -> Result<ServerName<'static>, ConnectionError> {
    ServerName::try_from(host.to_string()).map_err(|e| ConnectionError::TlsConfig {
        server: host.to_string(),
        reason: format!("invalid hostname for TLS: {}", e),
    })
}

fn version_label(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        other => format!("{:?}", other),
    }
}

/// Negotiated protocol version and cipher suite, as `"TLSv1.3 (TLS13_AES_256_GCM_SHA384)"`
#[must_use]
pub fn negotiated_info(connection: &ClientConnection) -> Option<String> {
    let version = connection.protocol_version()?;
    let suite = connection.negotiated_cipher_suite()?;
    Some(format!("{} ({})", version_label(version), suite_name(&suite)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VerifyLevel;

    fn settings(level: u8) -> TlsSettings {
        TlsSettings {
            enabled: true,
            verify: VerifyLevel::new(level).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_policy_verify_levels() {
        let global = GlobalSettings::default();

        let p0 = TlsPolicy::new(&settings(0), &global);
        assert!(!p0.verify_certificate);
        assert!(!p0.verify_hostname);

        let p1 = TlsPolicy::new(&settings(1), &global);
        assert!(p1.verify_certificate);
        assert!(!p1.verify_hostname);

        let p2 = TlsPolicy::new(&settings(2), &global);
        assert!(p2.verify_certificate);
        assert!(p2.verify_hostname);

        let p3 = TlsPolicy::new(&settings(3), &global);
        assert!(p3.verify_hostname);
    }

    #[test]
    fn test_global_switch_disables_all_checks() {
        let global = GlobalSettings {
            certificate_validation: false,
            ..Default::default()
        };
        let policy = TlsPolicy::new(&settings(2), &global);
        assert!(!policy.verify_certificate);
        assert!(!policy.verify_hostname);
    }

    #[test]
    fn test_cipher_override_caps_at_tls12() {
        let mut s = settings(2);
        let global = GlobalSettings::default();
        assert_eq!(TlsPolicy::new(&s, &global).protocol_versions().len(), 2);

        s.ciphers = Some("ECDHE-RSA-AES256-GCM-SHA384".to_string());
        let versions = TlsPolicy::new(&s, &global).protocol_versions();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, ProtocolVersion::TLSv1_2);
    }

    #[test]
    fn test_split_cipher_list() {
        let names: Vec<_> = split_cipher_list("A:B, C  D,,").collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(split_cipher_list(" : ").count(), 0);
    }

    #[test]
    fn test_select_cipher_suites_by_both_names() {
        let suites = select_cipher_suites(
            "ECDHE-RSA-AES256-GCM-SHA384:TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        );
        let names: Vec<_> = suites.iter().map(suite_name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384".to_string()));
        assert!(names.contains(&"TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256".to_string()));
    }

    #[test]
    fn test_select_cipher_suites_ignores_tls13_and_unknown() {
        assert!(select_cipher_suites("TLS13_AES_256_GCM_SHA384").is_empty());
        assert!(select_cipher_suites("RC4-MD5").is_empty());
    }

    #[test]
    fn test_build_connector_for_each_level() {
        let global = GlobalSettings::default();
        for level in 0..=3 {
            let policy = TlsPolicy::new(&settings(level), &global);
            assert!(build_connector("test", &policy).is_ok(), "level {level}");
        }
    }

    #[test]
    fn test_build_connector_rejects_unknown_ciphers() {
        let mut s = settings(2);
        s.ciphers = Some("RC4-MD5".to_string());
        let policy = TlsPolicy::new(&s, &GlobalSettings::default());
        let err = build_connector("test", &policy).err().expect("expected error");
        assert!(matches!(err, ConnectionError::TlsConfig { .. }));
    }

    #[test]
    fn test_build_connector_missing_cert_path() {
        let mut s = settings(2);
        s.cert_path = Some(PathBuf::from("/nonexistent/ca.pem"));
        let policy = TlsPolicy::new(&s, &GlobalSettings::default());
        assert!(build_connector("test", &policy).is_err());
    }

    #[test]
    fn test_certificate_loading() {
        let result = load_certificates(None).unwrap();
        assert!(!result.root_store.is_empty());
        assert!(
            result
                .sources
                .iter()
                .any(|s| s.contains("Mozilla") || s.contains("system"))
        );
    }

    #[test]
    fn test_server_name() {
        assert!(server_name("news.example.com").is_ok());
        assert!(server_name("192.0.2.1").is_ok());
        assert!(server_name("bad host name").is_err());
    }

    #[test]
    fn test_name_mismatch_detection() {
        assert!(is_name_mismatch(&CertificateError::NotValidForName));
        assert!(is_name_mismatch(&CertificateError::NotValidForNameContext {
            expected: ServerName::try_from("news.example.com").unwrap(),
            presented: vec!["other.example.com".to_string()],
        }));
        assert!(!is_name_mismatch(&CertificateError::UnknownIssuer));
        assert!(!is_name_mismatch(&CertificateError::Expired));
    }
}
