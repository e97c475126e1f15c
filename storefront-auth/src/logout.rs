//! Logout signalling.
//!
//! When the session cannot be recovered the pipeline clears the stored
//! credentials and emits a [`LogoutEvent`]. The UI layer decides what to do
//! with it, typically navigating to `redirect` when it is set.

use std::fmt;
use tokio::sync::mpsc;
use tracing::warn;

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// A request was rejected and no refresh token was stored.
    MissingRefreshToken,
    /// The refresh exchange failed.
    RefreshFailed,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRefreshToken => write!(f, "missing refresh token"),
            Self::RefreshFailed => write!(f, "refresh failed"),
        }
    }
}

/// A forced end of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutEvent {
    /// Why the session ended.
    pub reason: LogoutReason,
    /// Path of the request whose 401 triggered the logout.
    pub request_path: String,
    /// Where the user should be sent. `None` for public routes.
    pub redirect: Option<String>,
}

impl LogoutEvent {
    /// Whether the UI should navigate to the sign-in page.
    pub fn should_redirect(&self) -> bool {
        self.redirect.is_some()
    }
}

/// Receives logout events.
pub trait LogoutHandler: Send + Sync {
    /// Called after the credentials have been cleared.
    fn on_logout(&self, event: &LogoutEvent);
}

/// Handler that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogoutHandler;

impl LogoutHandler for TracingLogoutHandler {
    fn on_logout(&self, event: &LogoutEvent) {
        warn!(
            reason = %event.reason,
            path = %event.request_path,
            redirect = event.redirect.as_deref().unwrap_or("-"),
            "Session ended"
        );
    }
}

/// Handler forwarding events over a channel.
#[derive(Debug, Clone)]
pub struct ChannelLogoutHandler {
    tx: mpsc::UnboundedSender<LogoutEvent>,
}

impl ChannelLogoutHandler {
    /// Create a handler and the receiver the UI layer drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogoutEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogoutHandler for ChannelLogoutHandler {
    fn on_logout(&self, event: &LogoutEvent) {
        TracingLogoutHandler.on_logout(event);
        // Nobody listening is fine; the credentials are already gone.
        let _ = self.tx.send(event.clone());
    }
}
