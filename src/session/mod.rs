//! Per-slot NNTP protocol session
//!
//! A [`ProtocolSession`] owns one [`Connection`], the receive buffer and the
//! login handshake for a single connection slot. It is driven from one task
//! at a time by the scheduler:
//!
//! 1. [`init_connect`](ProtocolSession::init_connect) opens the transport
//! 2. each handshake reply is fed to
//!    [`finish_connect`](ProtocolSession::finish_connect) until
//!    [`connected`](ProtocolSession::connected) is true
//! 3. commands are sent and [`receive_chunk`](ProtocolSession::receive_chunk)
//!    is called on readiness until it reports the response complete
//! 4. [`soft_reset`](ProtocolSession::soft_reset) between articles,
//!    [`hard_reset`](ProtocolSession::hard_reset) on errors or shutdown
//!
//! Every command clears the buffer before it is written, so no bytes from
//! an earlier response are visible once a new command has been issued.
//! The deadline is advisory; the scheduler compares it against the clock
//! and hard-resets expired sessions.

mod auth;
mod buffer;
mod error;

pub use auth::{AuthAction, AuthFlags};
pub use buffer::ResponseBuffer;
pub use error::{PermanentProtocolError, SessionError};

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::article::{Article, ArticleVerb};
use crate::connection::{ConnectStatus, Connection};
use crate::constants::timeout;
use crate::profile::ServerProfile;
use crate::protocol::commands;
use crate::reactor::{Reactor, SlotKey};

/// Result of one read into the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRead {
    /// Bytes received by this call
    pub bytes: usize,
    /// The buffer now ends with the multi-line terminator
    pub complete: bool,
}

pub struct ProtocolSession {
    profile: Arc<ServerProfile>,
    slot: SlotKey,
    blocking: bool,
    reactor: Arc<dyn Reactor>,

    deadline: Option<Instant>,
    article: Option<Arc<Article>>,
    buffer: ResponseBuffer,
    auth: AuthFlags,
    group: Option<String>,
    connection: Option<Connection>,
}

impl ProtocolSession {
    /// Create an idle session for slot `index` of `profile`
    ///
    /// `blocking` is only set for one-shot server tests: the connect is then
    /// awaited inline and failures are returned to the caller.
    #[must_use]
    pub fn new(
        profile: Arc<ServerProfile>,
        index: usize,
        blocking: bool,
        reactor: Arc<dyn Reactor>,
    ) -> Self {
        let slot = SlotKey::new(profile.name().clone(), index);
        Self {
            profile,
            slot,
            blocking,
            reactor,
            deadline: None,
            article: None,
            buffer: ResponseBuffer::with_capacity(0),
            auth: AuthFlags::new(),
            group: None,
            connection: None,
        }
    }

    /// Allocate the buffer and start connecting
    ///
    /// In blocking mode the server address is resolved first when the
    /// profile has no cached result. Live sessions rely on the scheduler
    /// resolving servers up front.
    pub async fn init_connect(&mut self) -> Result<(), SessionError> {
        if self.blocking && !self.profile.has_addr_info() {
            self.profile.resolve().await?;
        }

        self.buffer = ResponseBuffer::default();
        let connection = Connection::open(
            &self.profile,
            self.profile.target_ip(),
            self.blocking,
            &self.slot,
            &self.reactor,
        )
        .await?;
        self.connection = Some(connection);
        self.refresh_deadline();
        Ok(())
    }

    /// Check whether a spawned connect has finished
    pub fn poll_connect(&mut self) -> ConnectStatus {
        self.connection
            .as_mut()
            .map_or(ConnectStatus::Failed, Connection::poll_connect)
    }

    /// Wait until a spawned connect has finished
    pub async fn wait_connected(&mut self) -> ConnectStatus {
        match self.connection.as_mut() {
            Some(connection) => connection.wait_connected().await,
            None => ConnectStatus::Failed,
        }
    }

    /// Feed one handshake reply into the login state machine
    ///
    /// Sends `AUTHINFO USER` or `AUTHINFO PASS` when the handshake asks for
    /// it. A rejected login or a fatal reply comes back as
    /// [`SessionError::Permanent`] carrying the buffered reply; the session
    /// must then be hard-reset.
    pub async fn finish_connect(&mut self, code: u16) -> Result<(), SessionError> {
        let action = self
            .auth
            .advance(code, self.profile.has_credentials())
            .map_err(|code| PermanentProtocolError {
                code,
                message: self.response_text(),
            })?;

        if let Some(command) = self.login_command(action) {
            self.send(command.as_bytes()).await?;
        }

        self.refresh_deadline();
        Ok(())
    }

    fn login_command(&self, action: AuthAction) -> Option<String> {
        match action {
            AuthAction::Idle => None,
            AuthAction::SendUser => Some(commands::authinfo_user(
                self.profile.username().map_or("", |u| u.as_str()),
            )),
            AuthAction::SendPass => Some(commands::authinfo_pass(
                self.profile.password().map_or("", |p| p.as_str()),
            )),
        }
    }

    /// Attach the article the next request is for
    pub fn assign_article(&mut self, article: Arc<Article>) {
        self.article = Some(article);
    }

    #[must_use]
    pub fn article(&self) -> Option<&Arc<Article>> {
        self.article.as_ref()
    }

    /// Request the assigned article
    ///
    /// The command follows the article's precheck flag and the server's
    /// STAT/BODY support; see [`ArticleVerb::select`].
    pub async fn request_article(&mut self) -> Result<ArticleVerb, SessionError> {
        let article = self.article.as_ref().ok_or(SessionError::NoArticle)?;
        let verb = ArticleVerb::select(
            article.precheck,
            self.profile.supports_stat(),
            self.profile.supports_body(),
        );
        let command = verb.command(&article.message_id);

        self.send(command.as_bytes()).await?;
        self.refresh_deadline();
        Ok(verb)
    }

    /// Select a newsgroup
    pub async fn send_group(&mut self, name: &str) -> Result<(), SessionError> {
        self.send(commands::group(name).as_bytes()).await?;
        self.refresh_deadline();
        Ok(())
    }

    /// Remember the currently selected newsgroup
    pub fn set_group(&mut self, name: Option<String>) {
        self.group = name;
    }

    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Take over the stream of a spawned connect if it has not been collected
    ///
    /// The connect task hands the stream over before it registers the
    /// socket, so this only waits when called ahead of the registration.
    async fn ensure_transport(&mut self) -> Result<(), SessionError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(SessionError::NotConnected)?;
        match connection.wait_connected().await {
            ConnectStatus::Connected => Ok(()),
            ConnectStatus::Pending | ConnectStatus::Failed => Err(SessionError::NotConnected),
        }
    }

    /// Clear the buffer, then write `command` to the server
    async fn send(&mut self, command: &[u8]) -> Result<(), SessionError> {
        self.ensure_transport().await?;
        let stream = self
            .connection
            .as_mut()
            .and_then(Connection::stream_mut)
            .ok_or(SessionError::NotConnected)?;
        self.buffer.clear();
        stream.write_all(command).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read whatever the server has sent into the buffer
    ///
    /// A spawned connect whose stream has not been collected yet is taken
    /// over first. The buffer grows if it is full. A zero-byte read means
    /// the server closed the connection and is returned as
    /// [`SessionError::TransportClosed`]. The response is complete once the
    /// buffer ends with the multi-line terminator.
    pub async fn receive_chunk(&mut self) -> Result<ChunkRead, SessionError> {
        self.ensure_transport().await?;

        if let Some((old, new)) = self.buffer.grow_if_full() {
            info!("Increasing buffer from {} to {} for {}", old, new, self);
        }

        let stream = self
            .connection
            .as_mut()
            .and_then(Connection::stream_mut)
            .ok_or(SessionError::NotConnected)?;
        let bytes = stream.read(self.buffer.spare_mut()).await?;
        if bytes == 0 {
            return Err(SessionError::TransportClosed);
        }

        self.refresh_deadline();
        self.buffer.advance(bytes);
        Ok(ChunkRead {
            bytes,
            complete: self.buffer.ends_with_terminator(),
        })
    }

    /// Reply code of the buffered response, once three bytes have arrived
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.buffer.status_code()
    }

    /// Buffered response decoded and trimmed
    #[must_use]
    pub fn response_text(&self) -> String {
        self.buffer.text()
    }

    /// Buffered response bytes without copying
    #[must_use]
    pub fn response_bytes(&self) -> &[u8] {
        self.buffer.filled()
    }

    /// Owned copy of the buffered response
    #[must_use]
    pub fn take_response(&self) -> Vec<u8> {
        self.buffer.filled().to_vec()
    }

    /// At least one complete line has been buffered
    ///
    /// Single-line replies never carry the multi-line terminator, so the
    /// handshake uses this to know a status line is ready.
    #[must_use]
    pub fn line_complete(&self) -> bool {
        self.buffer.has_line()
    }

    /// Prepare for the next article on the same connection
    pub fn soft_reset(&mut self) {
        self.deadline = None;
        self.article = None;
        self.buffer.clear();
    }

    /// Close the connection and start over
    ///
    /// `QUIT` is sent first when `send_quit` is set; close errors are
    /// swallowed. The session returns to its construction-time state. The
    /// new deadline is the full server timeout when `wait` is set (reset
    /// after an error), otherwise a short routine cooldown.
    pub async fn hard_reset(&mut self, wait: bool, send_quit: bool) {
        if let Some(mut connection) = self.connection.take() {
            connection.close(send_quit).await;
            debug!("{}: closed {}", self.slot, connection);
        }

        self.reset_to_fresh();

        let cooldown = if wait {
            self.profile.timeout()
        } else {
            timeout::ROUTINE_RESET_COOLDOWN
        };
        self.deadline = Some(Instant::now() + cooldown);
    }

    /// Restore every field except the construction parameters
    ///
    /// Dropping the connection also aborts a connect still in flight.
    pub fn reset_to_fresh(&mut self) {
        self.deadline = None;
        self.article = None;
        self.buffer = ResponseBuffer::with_capacity(0);
        self.auth.reset();
        self.group = None;
        self.connection = None;
    }

    fn refresh_deadline(&mut self) {
        self.deadline = Some(Instant::now() + self.profile.timeout());
    }

    /// The deadline has passed at `now`
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.auth.connected()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthFlags {
        &self.auth
    }

    #[must_use]
    pub fn buffer(&self) -> &ResponseBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> &Arc<ServerProfile> {
        &self.profile
    }

    #[must_use]
    pub fn slot(&self) -> &SlotKey {
        &self.slot
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }
}

impl fmt::Display for ProtocolSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<ProtocolSession: server={}:{}, slot={}, connected={}>",
            self.profile.host(),
            self.profile.port(),
            self.slot.index,
            self.auth.connected()
        )
    }
}

impl fmt::Debug for ProtocolSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolSession")
            .field("slot", &self.slot)
            .field("blocking", &self.blocking)
            .field("deadline", &self.deadline)
            .field("auth", &self.auth)
            .field("buffer_position", &self.buffer.position())
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GlobalSettings, ServerConfig};
    use crate::reactor::ChannelReactor;
    use crate::types::MessageId;
    use std::time::Duration;

    fn session() -> ProtocolSession {
        let config = ServerConfig::builder("news.example.com")
            .name("primary")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();
        let profile = Arc::new(ServerProfile::new(config, &GlobalSettings::default()));
        let (reactor, _rx) = ChannelReactor::channel();
        ProtocolSession::new(profile, 3, false, Arc::new(reactor))
    }

    #[test]
    fn test_new_session_is_idle() {
        let s = session();
        assert!(!s.connected());
        assert!(s.deadline().is_none());
        assert!(s.connection().is_none());
        assert_eq!(s.status_code(), None);
        assert_eq!(s.response_text(), "");
        assert_eq!(s.slot().index, 3);
        assert!(!s.is_blocking());
    }

    #[test]
    fn test_display() {
        let s = session();
        assert_eq!(
            s.to_string(),
            "<ProtocolSession: server=news.example.com:119, slot=3, connected=false>"
        );
    }

    #[test]
    fn test_soft_reset_idempotent() {
        let mut s = session();
        s.assign_article(Arc::new(Article::new(MessageId::new("a@b").unwrap())));
        s.refresh_deadline();

        s.soft_reset();
        let once = (s.deadline(), s.article().cloned(), s.buffer().position());
        s.soft_reset();
        let twice = (s.deadline(), s.article().cloned(), s.buffer().position());

        assert_eq!(once, twice);
        assert_eq!(once, (None, None, 0));
    }

    #[tokio::test]
    async fn test_hard_reset_without_connection() {
        let mut s = session();
        s.set_group(Some("alt.binaries.test".to_string()));

        let before = Instant::now();
        s.hard_reset(true, true).await;
        assert!(!s.connected());
        assert!(s.connection().is_none());
        assert_eq!(s.buffer().position(), 0);
        assert!(s.group().is_none());
        let deadline = s.deadline().unwrap();
        assert!(deadline >= before + Duration::from_secs(30));

        s.hard_reset(false, false).await;
        let deadline = s.deadline().unwrap();
        assert!(deadline < Instant::now() + Duration::from_secs(30));
        assert!(!s.is_blocking());
    }

    #[test]
    fn test_is_expired() {
        let mut s = session();
        assert!(!s.is_expired(Instant::now()));
        s.refresh_deadline();
        assert!(!s.is_expired(Instant::now()));
        assert!(s.is_expired(Instant::now() + Duration::from_secs(31)));
    }

    #[tokio::test]
    async fn test_request_without_article() {
        let mut s = session();
        assert!(matches!(
            s.request_article().await,
            Err(SessionError::NoArticle)
        ));
    }

    #[tokio::test]
    async fn test_io_without_connection() {
        let mut s = session();
        assert!(matches!(
            s.send_group("alt.test").await,
            Err(SessionError::NotConnected)
        ));
        assert!(matches!(
            s.receive_chunk().await,
            Err(SessionError::NotConnected)
        ));
        assert_eq!(s.poll_connect(), ConnectStatus::Failed);
    }

    #[tokio::test]
    async fn test_anonymous_handshake_needs_no_connection() {
        let mut s = session();
        s.finish_connect(200).await.unwrap();
        assert!(s.connected());
        assert!(s.deadline().is_some());
    }

    #[tokio::test]
    async fn test_fatal_reply_is_permanent() {
        let mut s = session();
        let err = s.finish_connect(502).await.unwrap_err();
        assert_eq!(err.code(), Some(502));
        assert!(err.requires_hard_reset());
    }
}
