//! Single-shot timers
//!
//! A [`Timer`] runs a callback once after a delay on the tokio runtime.
//! It can be cancelled until the moment it fires; cancelling afterwards, or
//! twice, does nothing.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use sipwire_sip_transport::Timer;
//!
//! # async fn example() {
//! let timer = Timer::start(Duration::from_millis(500), || {
//!     tracing::info!("Timer F expired");
//! });
//! if timer.cancel() {
//!     tracing::debug!("cancelled before expiry");
//! }
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// A cancellable single-shot timer
pub struct Timer {
    timeout: Duration,
    state: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

impl Timer {
    /// Starts a timer that calls `callback` once `timeout` has elapsed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(timeout: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(PENDING));
        let task_state = state.clone();

        trace!("Timer started for {:?}", timeout);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if task_state
                .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                debug!("Timer fired after {:?}", timeout);
                callback();
            }
        });

        Timer {
            timeout,
            state,
            handle,
        }
    }

    /// Cancels the timer. Returns `true` if this call prevented the callback
    /// from running, `false` if it had already fired or been cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            self.handle.abort();
            debug!("Timer cancelled");
        }
        cancelled
    }

    /// True once the callback has been invoked
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    /// True if the timer was cancelled before firing
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    /// True while the timer may still fire
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    /// The configured delay
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("timeout", &self.timeout)
            .field("fired", &self.has_fired())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        (count, move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once() {
        let (count, callback) = counter();
        let timer = Timer::start(Duration::from_secs(2), callback);
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(timer.has_fired());
        assert!(!timer.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_fire() {
        let (count, callback) = counter();
        let timer = Timer::start(Duration::from_secs(2), callback);
        assert!(timer.cancel());
        assert!(timer.is_cancelled());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!timer.has_fired());
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fire_is_noop() {
        let (count, callback) = counter();
        let timer = Timer::start(Duration::from_millis(10), callback);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!timer.cancel());
        assert!(timer.has_fired());
        assert!(!timer.is_cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
