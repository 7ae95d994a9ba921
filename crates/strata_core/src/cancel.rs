//! Cooperative cancellation.

use crate::error::{ReadError, ReadResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    canceled: Mutex<bool>,
    wakeup: Condvar,
}

/// A cloneable cancellation signal.
///
/// Long-running operations check the token between units of work and sleep
/// on it instead of on the clock, so [`cancel`](Self::cancel) wakes a
/// paused operation immediately.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a token that has not been canceled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every waiter.
    pub fn cancel(&self) {
        let mut canceled = self.inner.canceled.lock();
        *canceled = true;
        self.inner.wakeup.notify_all();
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        *self.inner.canceled.lock()
    }

    /// Fails with a canceled read failure once cancellation was requested.
    pub fn check(&self) -> ReadResult<()> {
        if self.is_canceled() {
            Err(ReadError::canceled("operation canceled"))
        } else {
            Ok(())
        }
    }

    /// Sleeps for up to `timeout`, returning early on cancellation.
    ///
    /// Returns true if the token was canceled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut canceled = self.inner.canceled.lock();
        while !*canceled {
            if self
                .inner
                .wakeup
                .wait_until(&mut canceled, deadline)
                .timed_out()
            {
                break;
            }
        }
        *canceled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_uncanceled() {
        let token = CancellationToken::new();
        assert!(!token.is_canceled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_canceled());
        assert!(token.check().unwrap_err().is_canceled());
    }

    #[test]
    fn wait_times_out_without_cancel() {
        let token = CancellationToken::new();
        let start = Instant::now();
        assert!(!token.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_wakes_waiter() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let canceled = waiter.wait_timeout(Duration::from_secs(30));
            (canceled, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        let (canceled, waited) = handle.join().unwrap();
        assert!(canceled);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn wait_on_canceled_token_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.wait_timeout(Duration::from_secs(30)));
    }
}
