use std::sync::Condvar;
use std::time::Duration;

use crate::sync::MutexGuard;
use crate::{Result, ThreadError};

/// A process-private condition variable, used paired with a locked [`Mutex`].
///
/// Waiting releases the paired mutex and reacquires it atomically around the
/// blocking interval — the guard goes in and the guard comes back, on every
/// path, timeout included. Spurious wakeups are possible; callers re-check
/// their predicate under the lock after every wake.
///
/// [`Mutex`]: crate::sync::Mutex
pub struct Cond {
    inner: Condvar,
}

impl Cond {
    /// Creates a new condition variable.
    pub const fn new() -> Self {
        Cond {
            inner: Condvar::new(),
        }
    }

    /// Wakes at least one thread blocked on this condition, if any.
    ///
    /// Which waiter wakes is unspecified; no ordering is guaranteed.
    pub fn signal(&self) {
        self.inner.notify_one();
    }

    /// Wakes all threads currently blocked on this condition.
    pub fn broadcast(&self) {
        self.inner.notify_all();
    }

    /// Blocks until signalled, releasing `guard` for the duration.
    ///
    /// Returns the reacquired guard.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the paired mutex was poisoned while we waited.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> Result<MutexGuard<'a, T>> {
        self.inner
            .wait(guard.inner)
            .map(|inner| MutexGuard { inner })
            .map_err(|_| ThreadError::InvalidState("mutex poisoned by a panicking thread"))
    }

    /// Blocks until signalled or until `timeout` elapses.
    ///
    /// Returns the reacquired guard together with a flag that is `true` if
    /// the wait timed out — a distinct outcome, not an error, since the
    /// mutex is re-held either way and the caller's predicate may have
    /// become true concurrently with the timeout.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the paired mutex was poisoned while we waited.
    pub fn wait_timeout<'a, T>(
        &self,
        guard: MutexGuard<'a, T>,
        timeout: Duration,
    ) -> Result<(MutexGuard<'a, T>, bool)> {
        self.inner
            .wait_timeout(guard.inner, timeout)
            .map(|(inner, res)| (MutexGuard { inner }, res.timed_out()))
            .map_err(|_| ThreadError::InvalidState("mutex poisoned by a panicking thread"))
    }
}

impl Default for Cond {
    fn default() -> Self {
        Self::new()
    }
}
