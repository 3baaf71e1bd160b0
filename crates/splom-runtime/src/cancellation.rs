#![forbid(unsafe_code)]

//! Cooperative cancellation for reconciliation runs.
//!
//! The controller keeps a [`CancellationSource`]; the worker receives a
//! [`CancellationToken`] and checks it at every cell boundary. Nothing is
//! interrupted mid-cell: an overlay's setup pass always runs to completion.
//!
//! ```
//! use splom_runtime::cancellation::CancellationSource;
//!
//! let source = CancellationSource::new();
//! let token = source.token();
//! let worker = std::thread::spawn(move || {
//!     let mut cells = 0;
//!     while !token.is_cancelled() && cells < 1_000_000 {
//!         cells += 1;
//!     }
//!     cells
//! });
//! assert!(source.cancel());
//! assert!(!source.cancel());
//! worker.join().unwrap();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Read side of a cancellation flag. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<Shared>,
}

/// Write side of a cancellation flag.
///
/// Dropping the source does not cancel its tokens.
#[derive(Debug)]
pub struct CancellationSource {
    inner: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    cancelled: AtomicBool,
    wake: (Mutex<()>, Condvar),
}

impl CancellationSource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                cancelled: AtomicBool::new(false),
                wake: (Mutex::new(()), Condvar::new()),
            }),
        }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Request cancellation and wake any waiting tokens.
    ///
    /// Returns `true` only for the call that flipped the flag.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::AcqRel);
        let (lock, cvar) = &self.inner.wake;
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        cvar.notify_all();
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        CancellationSource::new().token()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Block until cancelled or until `timeout` elapses.
    ///
    /// Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let deadline = Instant::now() + timeout;
        let (lock, cvar) = &self.inner.wake;
        let mut guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = cvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fresh_source_is_not_cancelled() {
        let source = CancellationSource::default();
        assert!(!source.is_cancelled());
        assert!(!source.token().is_cancelled());
    }

    #[test]
    fn cancel_reaches_every_token() {
        let source = CancellationSource::new();
        let a = source.token();
        let b = a.clone();
        assert!(source.cancel());
        assert!(a.is_cancelled() && b.is_cancelled());
    }

    #[test]
    fn only_first_cancel_reports_true() {
        let source = CancellationSource::new();
        assert!(source.cancel());
        assert!(!source.cancel());
        assert!(source.is_cancelled());
    }

    #[test]
    fn dropping_source_leaves_token_live() {
        let source = CancellationSource::new();
        let token = source.token();
        drop(source);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn never_token_times_out() {
        assert!(!CancellationToken::never().wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn wait_wakes_on_cancel_from_another_thread() {
        let source = CancellationSource::new();
        let token = source.token();
        let waiter = thread::spawn(move || token.wait_timeout(Duration::from_secs(10)));
        thread::sleep(Duration::from_millis(20));
        source.cancel();
        assert!(waiter.join().unwrap());
    }
}
