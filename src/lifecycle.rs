use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Cancellation signal shared between a resource owner and its worker task.
///
/// The owner keeps the `CancelPair` and calls [`CancelPair::cancel`]; the
/// worker holds a [`CancelHandle`] and awaits [`CancelHandle::cancelled`].
/// Signaling is sticky and idempotent.
pub struct CancelPair {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelPair {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Signal cancellation. Safe to call from any state, any number of times.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Create a handle for the worker side.
    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl Default for CancelPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Lightweight handle for observing cancellation.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        // Subscribe to Notify BEFORE checking the flag to avoid TOCTOU race:
        // without this, cancel() could fire between the check and the await,
        // and notify_waiters() would have no subscribers, losing the signal.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let pair = CancelPair::new();
        let handle = pair.handle();

        let waiter = tokio::spawn(async move {
            handle.cancelled().await;
        });

        pair.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish after cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_before_wait_returns_immediately() {
        let pair = CancelPair::new();
        pair.cancel();

        let handle = pair.handle();
        tokio::time::timeout(Duration::from_millis(100), handle.cancelled())
            .await
            .expect("already-cancelled handle must not block");
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let pair = CancelPair::new();
        pair.cancel();
        pair.cancel();
        assert!(pair.is_cancelled());
        assert!(pair.handle().is_cancelled());
    }
}
