//! Single-flight coordination of the token refresh.
//!
//! An [`AuthSession`] guarantees that at most one refresh exchange runs at a
//! time. The first caller to hit an expired token receives a
//! [`RefreshTicket`] and performs the exchange; everyone arriving while the
//! ticket is outstanding receives a [`RefreshWaiter`] and is settled with the
//! ticket's outcome, in the order they arrived.

use crate::error::AuthError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, trace};

type RefreshOutcome = Result<String, AuthError>;

#[derive(Debug, Default)]
struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh state shared by every request issued through one client.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    state: Arc<Mutex<RefreshState>>,
}

/// Result of [`AuthSession::acquire_refresh`].
#[derive(Debug)]
pub enum RefreshSlot {
    /// The caller owns the refresh and must settle the ticket.
    Owner(RefreshTicket),
    /// A refresh is already running; wait for its outcome.
    Waiter(RefreshWaiter),
}

impl AuthSession {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current refresh wave, starting one if none is running.
    pub fn acquire_refresh(&self) -> RefreshSlot {
        let mut state = self.state.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            trace!(position = state.waiters.len(), "Queued behind in-flight refresh");
            RefreshSlot::Waiter(RefreshWaiter { rx })
        } else {
            state.refreshing = true;
            debug!("Starting token refresh");
            RefreshSlot::Owner(RefreshTicket {
                session: self.clone(),
                settled: false,
            })
        }
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers queued behind the in-flight refresh.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn settle(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "Settling token refresh"
        );
        for waiter in waiters {
            // A waiter whose caller was dropped is simply skipped.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Exclusive right to perform the refresh exchange.
///
/// Dropping an unsettled ticket rejects all waiters with
/// [`AuthError::RefreshAbandoned`] and returns the session to idle.
#[derive(Debug)]
#[must_use = "an unsettled ticket abandons the refresh when dropped"]
pub struct RefreshTicket {
    session: AuthSession,
    settled: bool,
}

impl RefreshTicket {
    /// Hand the new access token to every waiter, in queue order.
    pub fn resolve(mut self, access_token: impl Into<String>) {
        self.settled = true;
        self.session.settle(Ok(access_token.into()));
    }

    /// Fail every waiter with the refresh error, in queue order.
    pub fn reject(mut self, error: AuthError) {
        self.settled = true;
        self.session.settle(Err(error));
    }
}

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        if !self.settled {
            self.session.settle(Err(AuthError::RefreshAbandoned));
        }
    }
}

/// A caller blocked behind another caller's refresh.
#[derive(Debug)]
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    /// Wait for the refresh to settle, yielding the new access token.
    pub async fn wait(self) -> Result<String, AuthError> {
        self.rx.await.unwrap_or(Err(AuthError::RefreshAbandoned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn owner(slot: RefreshSlot) -> RefreshTicket {
        match slot {
            RefreshSlot::Owner(ticket) => ticket,
            RefreshSlot::Waiter(_) => panic!("expected to own the refresh"),
        }
    }

    fn waiter(slot: RefreshSlot) -> RefreshWaiter {
        match slot {
            RefreshSlot::Waiter(waiter) => waiter,
            RefreshSlot::Owner(_) => panic!("expected to wait"),
        }
    }

    #[tokio::test]
    async fn test_single_owner_per_wave() {
        let session = AuthSession::new();
        let ticket = owner(session.acquire_refresh());
        assert!(session.is_refreshing());

        let waiters: Vec<_> = (0..4).map(|_| waiter(session.acquire_refresh())).collect();
        assert_eq!(session.waiting(), 4);

        ticket.resolve("fresh");
        assert!(!session.is_refreshing());
        assert_eq!(session.waiting(), 0);

        for w in waiters {
            assert_eq!(w.wait().await.unwrap(), "fresh");
        }
    }

    #[tokio::test]
    async fn test_waiters_settle_in_fifo_order() {
        let session = AuthSession::new();
        let ticket = owner(session.acquire_refresh());

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for id in 1..=3 {
            let w = waiter(session.acquire_refresh());
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let result = w.wait().await;
                order.lock().push(id);
                result
            }));
            tokio::task::yield_now().await;
        }

        ticket.reject(AuthError::rejected(401, "revoked"));
        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, AuthError::RefreshRejected { status: 401, .. }));
        }

        // Senders fire in queue order; on the current-thread runtime the
        // receivers wake in that same order.
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_dropped_ticket_abandons_wave() {
        let session = AuthSession::new();
        let ticket = owner(session.acquire_refresh());
        let w = waiter(session.acquire_refresh());

        drop(ticket);
        assert!(!session.is_refreshing());
        assert!(matches!(w.wait().await, Err(AuthError::RefreshAbandoned)));

        // The next failure starts a fresh wave.
        let _next = owner(session.acquire_refresh());
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_block_others() {
        let session = AuthSession::new();
        let ticket = owner(session.acquire_refresh());
        let gone = waiter(session.acquire_refresh());
        let kept = waiter(session.acquire_refresh());
        drop(gone);

        ticket.resolve("fresh");
        assert_eq!(kept.wait().await.unwrap(), "fresh");
    }

    #[test]
    fn test_waiter_pending_until_settled() {
        let session = AuthSession::new();
        let ticket = owner(session.acquire_refresh());
        let mut wait = tokio_test::task::spawn(waiter(session.acquire_refresh()).wait());

        tokio_test::assert_pending!(wait.poll());
        ticket.resolve("fresh");
        assert!(wait.is_woken());
        assert_eq!(tokio_test::assert_ready_ok!(wait.poll()), "fresh");
    }

    #[test]
    fn test_clones_share_state() {
        let session = AuthSession::new();
        let other = session.clone();
        let _ticket = owner(session.acquire_refresh());
        assert!(other.is_refreshing());
        assert!(matches!(other.acquire_refresh(), RefreshSlot::Waiter(_)));
    }
}
