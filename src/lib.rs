//! Per-connection NNTP protocol and transport core
//!
//! One [`ProtocolSession`] per connection slot of a multi-connection Usenet
//! downloader. The session owns a [`Connection`] (TCP socket, optional TLS,
//! connect bookkeeping), a growable receive buffer and the login handshake.
//! A scheduler drives many sessions from one task: it sends commands,
//! pulls chunks on readiness until a response is complete, and resets
//! sessions on errors or expired deadlines.
//!
//! Servers are described by a TOML [`Config`]; each configured server
//! becomes a shared [`ServerProfile`] holding cached address resolution, the
//! TLS connector and reputation fields that connect failures update.

pub mod args;
pub mod article;
pub mod config;
pub mod connection;
pub mod connection_error;
pub mod constants;
pub mod logging;
pub mod profile;
pub mod protocol;
pub mod reactor;
pub mod resolve;
pub mod session;
pub mod stream;
pub mod tls;
pub mod types;

pub use article::{Article, ArticleVerb};
pub use config::{Config, GlobalSettings, ServerConfig, TlsSettings, load_config};
pub use connection::{ConnectStatus, Connection, classify_and_record};
pub use connection_error::{ConnectFailure, ConnectionError, FailureKind};
pub use profile::ServerProfile;
pub use reactor::{ChannelReactor, Reactor, Registration, SlotKey, SocketDescriptor};
pub use resolve::{AddrInfo, AddressFamily};
pub use server_test::{ServerTestReport, test_server};
pub use session::{
    AuthFlags, ChunkRead, PermanentProtocolError, ProtocolSession, ResponseBuffer, SessionError,
};
pub use stream::ConnectionStream;
pub use tls::TlsPolicy;
