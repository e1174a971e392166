//! Socket and TLS lifecycle for one connection slot
//!
//! A [`Connection`] creates the socket, runs the connect sequence (TCP
//! connect, then the TLS handshake when enabled) and classifies failures.
//!
//! In blocking mode the sequence is awaited inline and failures are returned
//! to the caller. Otherwise it runs on a spawned task: on success the task
//! hands the stream back through a oneshot channel and then registers the
//! socket with the [`Reactor`]; on failure it records the classified error
//! on the server profile. The task never touches session state.
//!
//! Hand-over and registration happen under a gate that closing or dropping
//! the connection also takes, so once a reset has discarded a pending
//! connect its socket can no longer reach the reactor.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};

use socket2::{Socket, TcpKeepalive};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tracing::{debug, error, info, warn};

use crate::connection_error::{ConnectFailure, ConnectionError};
use crate::constants::{socket, timeout};
use crate::profile::ServerProfile;
use crate::protocol::commands;
use crate::reactor::{Reactor, SlotKey};
use crate::resolve::{AddrInfo, AddressFamily};
use crate::stream::ConnectionStream;
use crate::tls;

type ConnectOutcome = Result<ConnectionStream, String>;

/// Set once the owning connection has given up on a spawned connect
type DiscardGate = Arc<Mutex<bool>>;

enum ConnectState {
    /// Connect task still running
    Pending {
        rx: oneshot::Receiver<ConnectOutcome>,
        task: JoinHandle<()>,
        discarded: DiscardGate,
    },
    Connected(ConnectionStream),
    Failed,
    Closed,
}

/// Progress of a connection as seen by its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    Pending,
    Connected,
    Failed,
}

/// Transport of one session: socket, optional TLS, connect bookkeeping
pub struct Connection {
    peer_ip: String,
    port: u16,
    state: ConnectState,
    error_msg: Option<String>,
}

impl Connection {
    /// Create the socket and start connecting to `target_ip`
    ///
    /// `target_ip` is the address actually dialled; when it is a literal IPv4
    /// or IPv6 address it also decides the socket family, otherwise the
    /// family and address come from the profile's cached resolution.
    pub async fn open(
        profile: &Arc<ServerProfile>,
        target_ip: &str,
        blocking: bool,
        slot: &SlotKey,
        reactor: &Arc<dyn Reactor>,
    ) -> Result<Self, ConnectionError> {
        let addr_info = profile.addr_info();
        let Some(first) = addr_info.first().copied() else {
            return Err(ConnectionError::AddressUnavailable {
                server: profile.name().to_string(),
            });
        };

        let port = profile.port().get();
        let family = AddressFamily::of_literal(target_ip).unwrap_or(first.family);
        let addr = match target_ip.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, port),
            Err(_) => addr_info
                .iter()
                .find(|info| info.family == family)
                .map_or(first.addr, |info| info.addr),
        };

        let connector = profile.tls_connector()?;
        let socket = create_socket(family, &first)?;

        let mut connection = Self {
            peer_ip: target_ip.to_string(),
            port,
            state: ConnectState::Closed,
            error_msg: None,
        };

        if blocking {
            match connect_sequence(profile, socket, addr, connector, slot).await {
                Ok(stream) => connection.state = ConnectState::Connected(stream),
                Err(err) => {
                    let failure = classify_and_record(profile, target_ip, true, &err);
                    return Err(ConnectionError::Failed(failure));
                }
            }
        } else {
            let (tx, rx) = oneshot::channel();
            let discarded = DiscardGate::default();
            let task = tokio::spawn(connect_task(
                Arc::clone(profile),
                socket,
                addr,
                connector,
                target_ip.to_string(),
                slot.clone(),
                Arc::clone(reactor),
                tx,
                Arc::clone(&discarded),
            ));
            connection.state = ConnectState::Pending {
                rx,
                task,
                discarded,
            };
        }

        Ok(connection)
    }

    /// Collect the outcome of a spawned connect, if it has arrived
    pub fn poll_connect(&mut self) -> ConnectStatus {
        let outcome = match &mut self.state {
            ConnectState::Pending { rx, .. } => rx.try_recv(),
            ConnectState::Connected(_) => return ConnectStatus::Connected,
            ConnectState::Failed | ConnectState::Closed => return ConnectStatus::Failed,
        };

        match outcome {
            Ok(Ok(stream)) => {
                self.state = ConnectState::Connected(stream);
                ConnectStatus::Connected
            }
            Ok(Err(message)) => {
                self.error_msg = Some(message);
                self.state = ConnectState::Failed;
                ConnectStatus::Failed
            }
            Err(oneshot::error::TryRecvError::Empty) => ConnectStatus::Pending,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.error_msg = Some(ConnectionError::Cancelled.to_string());
                self.state = ConnectState::Failed;
                ConnectStatus::Failed
            }
        }
    }

    /// Wait for a spawned connect to finish
    pub async fn wait_connected(&mut self) -> ConnectStatus {
        let outcome = match &mut self.state {
            ConnectState::Pending { rx, .. } => Some(rx.await),
            _ => None,
        };
        if let Some(outcome) = outcome {
            self.state = match outcome {
                Ok(Ok(stream)) => ConnectState::Connected(stream),
                Ok(Err(message)) => {
                    self.error_msg = Some(message);
                    ConnectState::Failed
                }
                Err(_) => {
                    self.error_msg = Some(ConnectionError::Cancelled.to_string());
                    ConnectState::Failed
                }
            };
        }
        self.poll_connect()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectState::Connected(_))
    }

    /// The live stream, once connected
    pub fn stream_mut(&mut self) -> Option<&mut ConnectionStream> {
        match &mut self.state {
            ConnectState::Connected(stream) => Some(stream),
            _ => None,
        }
    }

    /// Address that was dialled
    #[must_use]
    pub fn peer_ip(&self) -> &str {
        &self.peer_ip
    }

    /// Last recorded connect failure
    #[must_use]
    pub fn error_msg(&self) -> Option<&str> {
        self.error_msg.as_deref()
    }

    /// Close the transport, best effort
    ///
    /// Optionally sends `QUIT` and pauses so it can leave the socket, then
    /// shuts the stream down. Errors are logged and swallowed. A connect
    /// still in flight is aborted.
    pub async fn close(&mut self, send_quit: bool) {
        match std::mem::replace(&mut self.state, ConnectState::Closed) {
            ConnectState::Connected(mut stream) => {
                if send_quit {
                    if let Err(e) = stream.write_all(commands::QUIT).await {
                        debug!("{}: QUIT failed: {}", self, e);
                    } else if let Err(e) = stream.flush().await {
                        debug!("{}: QUIT flush failed: {}", self, e);
                    }
                    tokio::time::sleep(timeout::QUIT_FLUSH).await;
                }
                if let Err(e) = stream.shutdown().await {
                    debug!("{}: shutdown failed: {}", self, e);
                }
            }
            ConnectState::Pending { task, discarded, .. } => discard(&task, &discarded),
            ConnectState::Failed | ConnectState::Closed => {}
        }
    }
}

/// Stop a spawned connect and keep its socket away from the reactor
fn discard(task: &JoinHandle<()>, discarded: &DiscardGate) {
    *discarded.lock().unwrap_or_else(PoisonError::into_inner) = true;
    task.abort();
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let ConnectState::Pending { task, discarded, .. } = &self.state {
            discard(task, discarded);
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Connection: {}:{}>", self.peer_ip, self.port)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            ConnectState::Pending { .. } => "pending",
            ConnectState::Connected(_) => "connected",
            ConnectState::Failed => "failed",
            ConnectState::Closed => "closed",
        };
        f.debug_struct("Connection")
            .field("peer_ip", &self.peer_ip)
            .field("port", &self.port)
            .field("state", &state)
            .field("error_msg", &self.error_msg)
            .finish()
    }
}

/// Create and tune the socket for one connection
fn create_socket(family: AddressFamily, info: &AddrInfo) -> Result<Socket, ConnectionError> {
    let config_error = |operation: &str| {
        let operation = operation.to_string();
        move |source| ConnectionError::SocketConfig { operation, source }
    };

    let socket = Socket::new(family.domain(), info.socket_type, Some(info.protocol))
        .map_err(config_error("create"))?;

    socket
        .set_tcp_nodelay(true)
        .map_err(config_error("nodelay"))?;
    socket
        .set_recv_buffer_size(socket::RECV_BUFFER)
        .map_err(config_error("recv buffer"))?;
    let keepalive = TcpKeepalive::new().with_time(socket::KEEPALIVE_IDLE);
    socket
        .set_tcp_keepalive(&keepalive)
        .map_err(config_error("keepalive"))?;

    Ok(socket)
}

/// TCP connect, then TLS handshake when a connector is given
///
/// Both steps are bounded by the server timeout.
async fn connect_sequence(
    profile: &ServerProfile,
    socket: Socket,
    addr: SocketAddr,
    connector: Option<TlsConnector>,
    slot: &SlotKey,
) -> Result<ConnectionStream, ConnectionError> {
    let limit = profile.timeout();
    let host = profile.host().as_str();
    let port = profile.port().get();
    let timed_out = || ConnectionError::Timeout {
        host: host.to_string(),
        port,
        timeout: limit,
    };

    let std_stream: std::net::TcpStream = socket.into();
    std_stream
        .set_nonblocking(true)
        .map_err(|source| ConnectionError::SocketConfig {
            operation: "nonblocking".to_string(),
            source,
        })?;

    let tcp = tokio::time::timeout(limit, TcpSocket::from_std_stream(std_stream).connect(addr))
        .await
        .map_err(|_| timed_out())?
        .map_err(|source| ConnectionError::TcpConnect {
            host: host.to_string(),
            port,
            source,
        })?;

    let Some(connector) = connector else {
        debug!("{}@{}: Connected to {}", slot.index, host, addr);
        return Ok(ConnectionStream::plain(tcp));
    };

    let domain = tls::server_name(host)?;
    let tls_stream = tokio::time::timeout(limit, connector.connect(domain, tcp))
        .await
        .map_err(|_| timed_out())?
        .map_err(|source| ConnectionError::TlsHandshake {
            server: profile.name().to_string(),
            source,
        })?;

    if let Some(tls_info) = tls::negotiated_info(tls_stream.get_ref().1) {
        info!("{}@{}: Connected using {}", slot.index, host, tls_info);
        profile.set_tls_info(tls_info);
    }

    Ok(ConnectionStream::tls(tls_stream))
}

/// Body of the spawned connect
#[allow(clippy::too_many_arguments)]
async fn connect_task(
    profile: Arc<ServerProfile>,
    socket: Socket,
    addr: SocketAddr,
    connector: Option<TlsConnector>,
    peer_ip: String,
    slot: SlotKey,
    reactor: Arc<dyn Reactor>,
    tx: oneshot::Sender<ConnectOutcome>,
    discarded: DiscardGate,
) {
    match connect_sequence(&profile, socket, addr, connector, &slot).await {
        Ok(stream) => hand_over(stream, tx, &discarded, reactor.as_ref(), slot),
        Err(err) => {
            let failure = classify_and_record(&profile, &peer_ip, false, &err);
            if tx.send(Err(failure.message)).is_err() {
                debug!("{}: connection discarded before failure was reported", slot);
            }
        }
    }
}

/// Give the stream to the connection, then register it with the reactor
fn hand_over(
    stream: ConnectionStream,
    tx: oneshot::Sender<ConnectOutcome>,
    discarded: &DiscardGate,
    reactor: &dyn Reactor,
    slot: SlotKey,
) {
    let gate = discarded.lock().unwrap_or_else(PoisonError::into_inner);
    if *gate {
        debug!("{}: connection discarded before connect finished", slot);
        return;
    }

    let descriptor = stream.descriptor();
    // The stream must be with the connection before the reactor polls it
    if tx.send(Ok(stream)).is_err() {
        debug!("{}: connection dropped before the stream was handed over", slot);
        return;
    }
    reactor.register_socket(descriptor, slot);
    drop(gate);
}

/// Classify a connect failure and report it
///
/// Certificate problems are always logged with their raw text. In blocking
/// mode the classified failure is returned as is for the caller to raise.
/// Otherwise the message becomes
/// `"Failed to connect: <reason> <host>:<port> (<ip>)"`, is stored as the
/// profile warning (logged at info when it repeats, warn when new) and the
/// profile is flagged for an early busy-connection re-check.
pub fn classify_and_record(
    profile: &ServerProfile,
    peer_ip: &str,
    blocking: bool,
    error: &ConnectionError,
) -> ConnectFailure {
    let host = profile.host().as_str();
    let failure = ConnectFailure::classify(error, host, profile.certificate_help_url());

    if failure.kind.is_certificate() {
        info!("Certificate error for host {}: {}", host, error);
        if !blocking && !profile.warning().contains(&failure.message) {
            error!("{}", failure.message);
        }
    }

    if blocking {
        return failure;
    }

    let message = format!(
        "Failed to connect: {} {}:{} ({})",
        failure.message,
        host,
        profile.port(),
        peer_ip
    );
    profile.request_early_recheck();
    if profile.replace_warning(message.clone()) {
        info!("{}", message);
    } else {
        warn!("{}", message);
    }

    ConnectFailure {
        kind: failure.kind,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GlobalSettings, ServerConfig};
    use crate::connection_error::FailureKind;
    use crate::reactor::ChannelReactor;
    use crate::types::ServerName;

    fn profile_for(port: u16) -> Arc<ServerProfile> {
        let config = ServerConfig::builder("127.0.0.1")
            .name("local")
            .port(port)
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap();
        let profile = ServerProfile::new(config, &GlobalSettings::default());
        profile.set_addr_info(vec![AddrInfo::tcp(SocketAddr::from(([127, 0, 0, 1], port)))]);
        Arc::new(profile)
    }

    fn slot() -> SlotKey {
        SlotKey::new(ServerName::new("local".to_string()).unwrap(), 0)
    }

    fn refused() -> ConnectionError {
        ConnectionError::TcpConnect {
            host: "127.0.0.1".to_string(),
            port: 119,
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        }
    }

    #[tokio::test]
    async fn test_open_without_addr_info_fails() {
        let config = ServerConfig::builder("news.example.com").build().unwrap();
        let profile = Arc::new(ServerProfile::new(config, &GlobalSettings::default()));
        let (reactor, _rx) = ChannelReactor::channel();
        let reactor: Arc<dyn Reactor> = Arc::new(reactor);

        let err = Connection::open(&profile, "news.example.com", true, &slot(), &reactor)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::AddressUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_blocking_open_connects() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let profile = profile_for(port);
        let (reactor, mut rx) = ChannelReactor::channel();
        let reactor: Arc<dyn Reactor> = Arc::new(reactor);

        let mut conn = Connection::open(&profile, "127.0.0.1", true, &slot(), &reactor)
            .await
            .unwrap();
        assert!(conn.is_connected());
        assert_eq!(conn.poll_connect(), ConnectStatus::Connected);
        assert_eq!(conn.to_string(), format!("<Connection: 127.0.0.1:{}>", port));
        // Blocking connects never involve the reactor
        assert!(rx.try_recv().is_err());
        conn.close(false).await;
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_blocking_open_refused_is_raised() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let profile = profile_for(port);
        let (reactor, _rx) = ChannelReactor::channel();
        let reactor: Arc<dyn Reactor> = Arc::new(reactor);

        let err = Connection::open(&profile, "127.0.0.1", true, &slot(), &reactor)
            .await
            .unwrap_err();
        let ConnectionError::Failed(failure) = err else {
            panic!("expected classified failure");
        };
        assert_eq!(failure.kind, FailureKind::Generic);
        // Blocking failures are not recorded on the profile
        assert!(profile.warning().is_empty());
        assert!(!profile.recheck_busy_early());
    }

    #[test]
    fn test_classify_and_record_live_mode() {
        let profile = profile_for(119);
        let failure = classify_and_record(&profile, "127.0.0.1", false, &refused());

        assert_eq!(
            failure.message,
            "Failed to connect: refused 127.0.0.1:119 (127.0.0.1)"
        );
        assert_eq!(profile.warning(), failure.message);
        assert!(profile.take_recheck_busy_early());

        // Same failure again leaves the warning unchanged
        let again = classify_and_record(&profile, "127.0.0.1", false, &refused());
        assert_eq!(again.message, profile.warning());
        assert!(profile.recheck_busy_early());
    }

    #[test]
    fn test_classify_and_record_live_certificate_error() {
        let profile = profile_for(563);
        let err = ConnectionError::TlsHandshake {
            server: "local".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
            ),
        };
        let raw = ConnectFailure::classify(&err, "127.0.0.1", profile.certificate_help_url());

        let failure = classify_and_record(&profile, "127.0.0.1", false, &err);
        assert_eq!(failure.kind, FailureKind::UntrustedCertificate);
        assert_eq!(
            failure.message,
            format!("Failed to connect: {} 127.0.0.1:563 (127.0.0.1)", raw.message)
        );
        // The stored warning already names the certificate problem, so a
        // repeat is not raised as an error again
        assert!(profile.warning().contains(&raw.message));
        assert!(profile.take_recheck_busy_early());

        let again = classify_and_record(&profile, "127.0.0.1", false, &err);
        assert_eq!(again.message, failure.message);
        assert_eq!(profile.warning(), failure.message);
        assert!(profile.recheck_busy_early());
    }

    #[test]
    fn test_classify_and_record_blocking_mode() {
        let profile = profile_for(119);
        let failure = classify_and_record(&profile, "127.0.0.1", true, &refused());
        assert_eq!(failure.message, "refused");
        assert!(profile.warning().is_empty());
    }

    #[test]
    fn test_create_socket_families() {
        let v4 = AddrInfo::tcp("127.0.0.1:119".parse().unwrap());
        assert!(create_socket(AddressFamily::Inet, &v4).is_ok());
    }
}
