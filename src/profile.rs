//! Shared per-server runtime state
//!
//! A [`ServerProfile`] is built once per configured server and shared by
//! every session connecting to it (`Arc<ServerProfile>`). The configured
//! values are immutable; the cached lookups and reputation fields are
//! written from connect tasks and read by the scheduler, so each one sits
//! behind its own lock or atomic.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;

use tokio_rustls::TlsConnector;

use crate::config::{GlobalSettings, ServerConfig};
use crate::connection_error::ConnectionError;
use crate::resolve::{self, AddrInfo};
use crate::tls::{self, TlsPolicy};
use crate::types::{HostName, Password, Port, ServerName, ServerTimeout, Username};

/// Lock a mutex, recovering the data if a previous holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Runtime view of one configured server
pub struct ServerProfile {
    name: ServerName,
    host: HostName,
    port: Port,
    username: Option<Username>,
    password: Option<Password>,
    timeout: ServerTimeout,
    host_ip: Option<String>,
    tls_enabled: bool,
    tls_policy: TlsPolicy,
    certificate_help_url: String,

    addr_info: RwLock<Vec<AddrInfo>>,
    tls_connector: Mutex<Option<TlsConnector>>,
    warning: Mutex<String>,
    recheck_busy_early: AtomicBool,
    tls_info: Mutex<Option<String>>,
    supports_stat: AtomicBool,
    supports_body: AtomicBool,
}

impl ServerProfile {
    #[must_use]
    pub fn new(config: ServerConfig, global: &GlobalSettings) -> Self {
        let port = config.effective_port();
        Self {
            tls_policy: TlsPolicy::new(&config.tls, global),
            tls_enabled: config.tls.enabled,
            certificate_help_url: global.certificate_help_url.clone(),
            name: config.name,
            host: config.host,
            port,
            username: config.username,
            password: config.password,
            timeout: config.timeout,
            host_ip: config.host_ip,
            addr_info: RwLock::new(Vec::new()),
            tls_connector: Mutex::new(None),
            warning: Mutex::new(String::new()),
            recheck_busy_early: AtomicBool::new(false),
            tls_info: Mutex::new(None),
            supports_stat: AtomicBool::new(config.supports_stat),
            supports_body: AtomicBool::new(config.supports_body),
        }
    }

    #[must_use]
    pub fn name(&self) -> &ServerName {
        &self.name
    }

    #[must_use]
    pub fn host(&self) -> &HostName {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> Port {
        self.port
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout.as_duration()
    }

    #[must_use]
    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    #[must_use]
    pub fn password(&self) -> Option<&Password> {
        self.password.as_ref()
    }

    /// Log in when either credential is configured
    ///
    /// A missing half is sent as an empty value.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }

    /// Address the connection dials: the upstream-chosen IP, or the hostname
    #[must_use]
    pub fn target_ip(&self) -> &str {
        self.host_ip.as_deref().unwrap_or(self.host.as_str())
    }

    #[must_use]
    pub fn tls_enabled(&self) -> bool {
        self.tls_enabled
    }

    #[must_use]
    pub fn tls_policy(&self) -> &TlsPolicy {
        &self.tls_policy
    }

    #[must_use]
    pub fn certificate_help_url(&self) -> &str {
        &self.certificate_help_url
    }

    // Address resolution cache

    /// Cached resolution result (empty until resolved)
    #[must_use]
    pub fn addr_info(&self) -> Vec<AddrInfo> {
        self.addr_info
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn has_addr_info(&self) -> bool {
        !self
            .addr_info
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_empty()
    }

    pub fn set_addr_info(&self, info: Vec<AddrInfo>) {
        *self
            .addr_info
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = info;
    }

    /// Resolve the configured host and cache the result
    pub async fn resolve(&self) -> Result<(), ConnectionError> {
        let info = resolve::resolve(self.host.as_str(), self.port.get()).await?;
        self.set_addr_info(info);
        Ok(())
    }

    // TLS connector cache

    /// Connector for this server, built on first use
    ///
    /// Returns `None` when TLS is disabled.
    pub fn tls_connector(&self) -> Result<Option<TlsConnector>, ConnectionError> {
        if !self.tls_enabled {
            return Ok(None);
        }
        let mut cached = lock(&self.tls_connector);
        if let Some(connector) = cached.as_ref() {
            return Ok(Some(connector.clone()));
        }
        let connector = tls::build_connector(self.name.as_str(), &self.tls_policy)?;
        *cached = Some(connector.clone());
        Ok(Some(connector))
    }

    #[must_use]
    pub fn has_tls_connector(&self) -> bool {
        lock(&self.tls_connector).is_some()
    }

    // Reputation fields

    /// Last connect warning recorded for this server
    #[must_use]
    pub fn warning(&self) -> String {
        lock(&self.warning).clone()
    }

    /// Store a warning, returning true if it repeats the previous one
    pub fn replace_warning(&self, message: String) -> bool {
        let mut warning = lock(&self.warning);
        let repeated = *warning == message;
        *warning = message;
        repeated
    }

    /// Ask the scheduler to re-check busy connections on its next pass
    pub fn request_early_recheck(&self) {
        self.recheck_busy_early.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn recheck_busy_early(&self) -> bool {
        self.recheck_busy_early.load(Ordering::Acquire)
    }

    /// Read and clear the early-recheck flag
    pub fn take_recheck_busy_early(&self) -> bool {
        self.recheck_busy_early.swap(false, Ordering::AcqRel)
    }

    /// Negotiated TLS version and cipher from the latest handshake
    #[must_use]
    pub fn tls_info(&self) -> Option<String> {
        lock(&self.tls_info).clone()
    }

    pub fn set_tls_info(&self, info: String) {
        *lock(&self.tls_info) = Some(info);
    }

    // Capability flags

    #[must_use]
    pub fn supports_stat(&self) -> bool {
        self.supports_stat.load(Ordering::Relaxed)
    }

    pub fn set_supports_stat(&self, supported: bool) {
        self.supports_stat.store(supported, Ordering::Relaxed);
    }

    #[must_use]
    pub fn supports_body(&self) -> bool {
        self.supports_body.load(Ordering::Relaxed)
    }

    pub fn set_supports_body(&self, supported: bool) {
        self.supports_body.store(supported, Ordering::Relaxed);
    }
}

impl fmt::Debug for ServerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerProfile")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls_enabled", &self.tls_enabled)
            .field("has_credentials", &self.has_credentials())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ServerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
