//! Session lifecycle
//!
//! A [`SessionGuard`] owns the login for the duration of a run. The session
//! is deleted exactly once: by [`SessionGuard::close`], or by `Drop` if the
//! guard goes out of scope first (early return, `?`, or panic unwinding).

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::{Auth, Result, Transport};

/// How requests authenticate against the BMC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AuthMode {
    /// Log in through SessionService and send `X-Auth-Token`
    #[default]
    Session,
    /// Send HTTP basic credentials with every request
    Basic,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "basic" => Ok(Self::Basic),
            other => Err(format!("expected \"session\" or \"basic\", got \"{other}\"")),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => f.write_str("session"),
            Self::Basic => f.write_str("basic"),
        }
    }
}

/// A session issued by the BMC.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Value for the `X-Auth-Token` header
    pub token: String,
    /// Link to the session resource, deleted on logout
    pub location: String,
}

impl Session {
    pub fn new(token: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            location: location.into(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("location", &self.location)
            .finish()
    }
}

/// Scoped login: acquire on `open`, release on `close` or drop.
pub struct SessionGuard<'a, T: Transport + ?Sized> {
    transport: &'a T,
    auth: Auth,
    session: Option<Session>,
}

impl<'a, T: Transport + ?Sized> SessionGuard<'a, T> {
    /// Authenticate against the BMC.
    ///
    /// In [`AuthMode::Session`] this logs in and fails fast if the BMC
    /// refuses. In [`AuthMode::Basic`] nothing is sent and there is nothing
    /// to release.
    pub fn open(transport: &'a T, username: &str, password: &str, mode: AuthMode) -> Result<Self> {
        match mode {
            AuthMode::Session => {
                let session = transport.create_session(username, password)?;
                info!(location = %session.location, "Opened Redfish session");
                Ok(Self {
                    transport,
                    auth: Auth::Token(session.token.clone()),
                    session: Some(session),
                })
            }
            AuthMode::Basic => {
                debug!(username, "Using basic authentication; no session to open");
                Ok(Self {
                    transport,
                    auth: Auth::Basic {
                        username: username.to_string(),
                        password: password.to_string(),
                    },
                    session: None,
                })
            }
        }
    }

    /// Credentials for resource requests made under this guard.
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// The open session, if the guard holds one.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Release the session now and report the outcome.
    pub fn close(mut self) -> Result<()> {
        self.release().unwrap_or(Ok(()))
    }

    fn release(&mut self) -> Option<Result<()>> {
        let session = self.session.take()?;
        let outcome = self.transport.delete_session(&session);
        if outcome.is_ok() {
            info!(location = %session.location, "Closed Redfish session");
        }
        Some(outcome)
    }
}

impl<T: Transport + ?Sized> Drop for SessionGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(Err(e)) = self.release() {
            warn!(error = %e, "Failed to delete Redfish session");
        }
    }
}
