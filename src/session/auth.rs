//! Login handshake state machine
//!
//! The handshake is driven one reply at a time. [`AuthFlags::advance`] is
//! pure: it updates the flags and says which command, if any, the session
//! has to send next. Sending and buffer handling stay in the session.
//!
//! ```text
//! NeedUser -> AwaitUser --381--> NeedPass -> AwaitPass --281--> Ready
//!                 |                                    \
//!                 +--281 (no password needed)--> Ready  +--other--> rejected
//! ```
//!
//! A 480 at any point drops back to `NeedUser` with a forced login, so a
//! server that only asks for credentials mid-session restarts the sequence
//! on the same session.

use crate::protocol::codes;

/// Next step requested by the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    /// Nothing to send; wait for the next reply (or done if connected)
    Idle,
    /// Send `AUTHINFO USER`
    SendUser,
    /// Send `AUTHINFO PASS`
    SendPass,
}

/// Handshake progress flags
///
/// Invariants kept by [`advance`](Self::advance): `user_ok` implies
/// `user_sent`; `pass_ok` implies `pass_sent` and `user_ok`; `connected`
/// only once both phases are done or no login is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthFlags {
    connected: bool,
    user_sent: bool,
    user_ok: bool,
    pass_sent: bool,
    pass_ok: bool,
    force_login: bool,
}

impl AuthFlags {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connected: false,
            user_sent: false,
            user_ok: false,
            pass_sent: false,
            pass_ok: false,
            force_login: false,
        }
    }

    /// Feed one reply code into the handshake
    ///
    /// Returns the command to send next, or the reply code as `Err` when the
    /// reply ends the session (400/500/502 at any point, a non-281 answer to
    /// the password, or a login demand with no credentials configured).
    pub fn advance(&mut self, code: u16, has_credentials: bool) -> Result<AuthAction, u16> {
        if !has_credentials && !self.force_login {
            self.mark_all();
        }

        if code == codes::AUTH_REQUIRED {
            self.force_login = true;
            self.clear_progress();
        }

        if codes::is_fatal_handshake_reply(code) {
            return Err(code);
        }

        if !self.user_sent {
            if !has_credentials {
                return Err(code);
            }
            self.user_sent = true;
            return Ok(AuthAction::SendUser);
        }

        if !self.user_ok {
            match code {
                codes::PASSWORD_REQUIRED => self.user_ok = true,
                codes::AUTH_ACCEPTED => {
                    self.user_ok = true;
                    self.pass_sent = true;
                    self.pass_ok = true;
                    self.connected = true;
                }
                _ => {}
            }
        }

        if self.user_ok && !self.pass_sent {
            self.pass_sent = true;
            return Ok(AuthAction::SendPass);
        }

        if self.user_ok && !self.pass_ok {
            if code != codes::AUTH_ACCEPTED {
                return Err(code);
            }
            self.pass_ok = true;
            self.connected = true;
        }

        Ok(AuthAction::Idle)
    }

    /// Back to construction-time state, forced login included
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn mark_all(&mut self) {
        self.connected = true;
        self.user_sent = true;
        self.user_ok = true;
        self.pass_sent = true;
        self.pass_ok = true;
    }

    fn clear_progress(&mut self) {
        self.connected = false;
        self.user_sent = false;
        self.user_ok = false;
        self.pass_sent = false;
        self.pass_ok = false;
    }

    #[must_use]
    #[inline]
    pub const fn connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    #[inline]
    pub const fn user_sent(&self) -> bool {
        self.user_sent
    }

    #[must_use]
    #[inline]
    pub const fn user_ok(&self) -> bool {
        self.user_ok
    }

    #[must_use]
    #[inline]
    pub const fn pass_sent(&self) -> bool {
        self.pass_sent
    }

    #[must_use]
    #[inline]
    pub const fn pass_ok(&self) -> bool {
        self.pass_ok
    }

    #[must_use]
    #[inline]
    pub const fn force_login(&self) -> bool {
        self.force_login
    }
}
