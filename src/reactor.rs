//! Seam between connections and the scheduler that polls them
//!
//! A non-blocking connect finishes on its own task. When it succeeds, the
//! task hands the socket descriptor to the [`Reactor`] together with the
//! slot it belongs to; the scheduler then drives that slot's session.

use std::fmt;
use tokio::sync::mpsc;

use crate::types::ServerName;

/// OS-level socket descriptor (fd on Unix, SOCKET on Windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketDescriptor(u64);

impl SocketDescriptor {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Descriptor of a live socket
    #[cfg(unix)]
    pub fn of<S: std::os::fd::AsRawFd>(socket: &S) -> Self {
        Self(socket.as_raw_fd() as u64)
    }

    /// Descriptor of a live socket
    #[cfg(windows)]
    pub fn of<S: std::os::windows::io::AsRawSocket>(socket: &S) -> Self {
        Self(socket.as_raw_socket())
    }
}

impl fmt::Display for SocketDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one connection slot: the server plus its slot index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub server: ServerName,
    pub index: usize,
}

impl SlotKey {
    #[must_use]
    pub fn new(server: ServerName, index: usize) -> Self {
        Self { server, index }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.server, self.index)
    }
}

/// Scheduler side of the connect handoff
///
/// `register_socket` is called exactly once per successful non-blocking
/// connect, from the connect task, after the stream has been handed to the
/// owning connection. Implementations must not block.
pub trait Reactor: Send + Sync {
    fn register_socket(&self, descriptor: SocketDescriptor, slot: SlotKey);
}

/// A socket that finished connecting and is ready to be polled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub descriptor: SocketDescriptor,
    pub slot: SlotKey,
}

/// Reactor backed by an unbounded channel
///
/// The scheduler loop drains the receiver on each iteration and calls
/// `poll_connect` on the named slot's session.
#[derive(Debug, Clone)]
pub struct ChannelReactor {
    tx: mpsc::UnboundedSender<Registration>,
}

impl ChannelReactor {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Registration>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reactor for ChannelReactor {
    fn register_socket(&self, descriptor: SocketDescriptor, slot: SlotKey) {
        if self
            .tx
            .send(Registration {
                descriptor,
                slot: slot.clone(),
            })
            .is_err()
        {
            tracing::debug!("Reactor gone, dropping registration for {}", slot);
        }
    }
}
