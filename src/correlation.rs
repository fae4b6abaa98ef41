//! Correlation of commands with their responses.
//!
//! A sender registers interest in its command code before writing the
//! command, then waits on the returned [`PendingResponse`]. Every signal
//! is delivered to every registered waiter for that code, so responses
//! dispatched back to back are not lost:
//!
//! ```text
//!   send_command                 dispatcher
//!   ────────────                 ──────────
//!   reset()          last = None
//!   register(code)
//!   write frame ─────────────────▶ read event
//!   pending.wait()                update state
//!        ◀──────── response ──── signal(code, status)
//! ```
//!
//! Waiters are keyed by command code only. Two commands with the same code
//! in flight at once cannot be told apart: whichever response arrives first
//! releases both waiters.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{MgmtError, Result};

/// A response as seen by the correlation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Command the response belongs to.
    pub code: u16,
    /// Status reported by the controller.
    pub status: u8,
}

#[derive(Debug)]
struct Waiter {
    code: u16,
    tx: oneshot::Sender<Response>,
}

#[derive(Debug, Default)]
struct Inner {
    last: Option<Response>,
    waiters: Vec<Waiter>,
}

impl Inner {
    fn register(&mut self, code: u16) -> PendingResponse {
        // Drop waiters that gave up (timed out or write failed)
        self.waiters.retain(|waiter| !waiter.tx.is_closed());
        let (tx, rx) = oneshot::channel();
        self.waiters.push(Waiter { code, tx });
        PendingResponse { code, rx }
    }
}

/// Response slot shared by the command senders and the dispatcher.
#[derive(Debug, Default)]
pub struct ResponseSlot {
    inner: Mutex<Inner>,
}

impl ResponseSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the last response before a new command is sent.
    ///
    /// Registered waiters are kept.
    pub fn reset(&self) {
        self.inner.lock().last = None;
    }

    /// Register interest in the response to `code`.
    ///
    /// Call before writing the command; any later signal for `code`
    /// completes the returned handle.
    pub fn register(&self, code: u16) -> PendingResponse {
        self.inner.lock().register(code)
    }

    /// Record a response and release every waiter registered for `code`.
    pub fn signal(&self, code: u16, status: u8) {
        let response = Response { code, status };
        let mut inner = self.inner.lock();
        inner.last = Some(response);

        let (matched, rest): (Vec<_>, Vec<_>) =
            inner.waiters.drain(..).partition(|waiter| waiter.code == code);
        inner.waiters = rest;
        for waiter in matched {
            // The receiver may have timed out already
            let _ = waiter.tx.send(response);
        }
    }

    /// Most recently signalled response, if any since the last reset.
    pub fn last(&self) -> Option<Response> {
        self.inner.lock().last
    }

    /// Number of registered waiters that have not been released.
    pub fn pending(&self) -> usize {
        let inner = self.inner.lock();
        inner.waiters.iter().filter(|waiter| !waiter.tx.is_closed()).count()
    }

    /// Wait until a response for `code` is signalled.
    ///
    /// A matching response already recorded since the last reset counts.
    pub async fn await_response(&self, code: u16, timeout: Duration) -> Result<Response> {
        let pending = {
            let mut inner = self.inner.lock();
            if let Some(response) = inner.last.filter(|r| r.code == code) {
                return Ok(response);
            }
            inner.register(code)
        };
        pending.wait(timeout).await
    }
}

/// Handle returned by [`ResponseSlot::register`].
#[derive(Debug)]
pub struct PendingResponse {
    code: u16,
    rx: oneshot::Receiver<Response>,
}

impl PendingResponse {
    /// Command code this handle waits for.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Wait for the response, at most `timeout`.
    pub async fn wait(self, timeout: Duration) -> Result<Response> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(response)) => Ok(response),
            // Sender dropped without a signal: the slot itself is gone.
            Ok(Err(_)) => Err(MgmtError::ConnectionClosed),
            Err(_) => Err(MgmtError::Timeout(self.code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_signal_releases_waiter() {
        let slot = Arc::new(ResponseSlot::new());

        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.await_response(1, Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        slot.signal(1, 0);

        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response, Response { code: 1, status: 0 });
    }

    #[tokio::test]
    async fn test_signal_before_wait_is_seen() {
        let slot = ResponseSlot::new();
        slot.signal(4, 0);

        assert!(slot.await_response(4, SHORT).await.is_ok());
    }

    #[tokio::test]
    async fn test_timeout_without_signal() {
        let slot = ResponseSlot::new();

        assert!(matches!(
            slot.await_response(1, SHORT).await,
            Err(MgmtError::Timeout(1))
        ));
    }

    #[tokio::test]
    async fn test_other_code_does_not_release() {
        let slot = ResponseSlot::new();
        slot.signal(5, 0);

        assert!(matches!(
            slot.await_response(4, SHORT).await,
            Err(MgmtError::Timeout(4))
        ));
    }

    #[tokio::test]
    async fn test_reset_clears_slot() {
        let slot = ResponseSlot::new();
        slot.signal(1, 0x0A);
        assert_eq!(slot.last(), Some(Response { code: 1, status: 0x0A }));

        slot.reset();

        assert_eq!(slot.last(), None);
        assert!(slot.await_response(1, SHORT).await.is_err());
    }

    #[tokio::test]
    async fn test_only_matching_waiter_returns() {
        let slot = Arc::new(ResponseSlot::new());

        let powered = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.await_response(5, SHORT).await })
        };
        let version = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.await_response(1, Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        slot.signal(1, 0);

        assert!(version.await.unwrap().is_ok());
        assert!(matches!(powered.await.unwrap(), Err(MgmtError::Timeout(5))));
    }

    #[tokio::test]
    async fn test_back_to_back_signals_reach_their_waiters() {
        let slot = ResponseSlot::new();
        let powered = slot.register(5);
        let version = slot.register(1);

        // Both land before either waiter is polled
        slot.signal(5, 0);
        slot.signal(1, 0);

        assert_eq!(powered.wait(SHORT).await.unwrap(), Response { code: 5, status: 0 });
        assert_eq!(version.wait(SHORT).await.unwrap(), Response { code: 1, status: 0 });
        assert_eq!(slot.last(), Some(Response { code: 1, status: 0 }));
    }

    #[tokio::test]
    async fn test_reset_keeps_registered_waiters() {
        let slot = ResponseSlot::new();
        let pending = slot.register(4);

        slot.reset();
        slot.signal(4, 0x0D);

        assert_eq!(pending.wait(SHORT).await.unwrap().status, 0x0D);
    }

    #[tokio::test]
    async fn test_same_code_releases_all_waiters() {
        let slot = ResponseSlot::new();
        let first = slot.register(7);
        let second = slot.register(7);

        slot.signal(7, 0);

        assert!(first.wait(SHORT).await.is_ok());
        assert!(second.wait(SHORT).await.is_ok());
        assert_eq!(slot.pending(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_waiters_are_pruned() {
        let slot = ResponseSlot::new();
        assert!(slot.register(5).wait(SHORT).await.is_err());
        drop(slot.register(6));

        let _live = slot.register(1);

        assert_eq!(slot.pending(), 1);
    }
}
