use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{self, TryLockError};
use std::thread::ThreadId;

use crate::sync::Cond;
use crate::{thread, Result, ThreadError};

/// A binary mutual-exclusion lock owning the data it protects.
///
/// This is the form the rest of the crate builds on: the lock releases when
/// the returned [`MutexGuard`] drops, so an unlock by a non-owning thread is
/// unrepresentable. Re-locking from the thread that already holds the guard
/// is a caller error that deadlocks or panics; it is intentionally not
/// upgraded to recursive behavior — use [`RawMutex`] with
/// [`MutexKind::Recursive`] when recursion is wanted.
pub struct Mutex<T> {
    inner: sync::Mutex<T>,
}

impl<T> Mutex<T> {
    /// Creates a new unlocked mutex protecting `value`.
    pub const fn new(value: T) -> Self {
        Mutex {
            inner: sync::Mutex::new(value),
        }
    }

    /// Acquires the lock, blocking the calling thread until it is free.
    ///
    /// # Errors
    ///
    /// `InvalidState` if a thread previously panicked while holding the
    /// lock (the protected data may be inconsistent).
    pub fn lock(&self) -> Result<MutexGuard<'_, T>> {
        self.inner
            .lock()
            .map(|inner| MutexGuard { inner })
            .map_err(|_| ThreadError::InvalidState("mutex poisoned by a panicking thread"))
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// # Errors
    ///
    /// `Busy` if the lock is currently held by another thread;
    /// `InvalidState` if the mutex is poisoned.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, T>> {
        match self.inner.try_lock() {
            Ok(inner) => Ok(MutexGuard { inner }),
            Err(TryLockError::WouldBlock) => Err(ThreadError::Busy),
            Err(TryLockError::Poisoned(_)) => {
                Err(ThreadError::InvalidState("mutex poisoned by a panicking thread"))
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex").field("inner", &self.inner).finish()
    }
}

/// RAII guard for a locked [`Mutex`]; the lock releases on drop.
pub struct MutexGuard<'a, T> {
    pub(super) inner: sync::MutexGuard<'a, T>,
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

/// Locking discipline for a [`RawMutex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexKind {
    /// Binary lock. A re-lock by the owning thread deadlocks that thread;
    /// this mirrors standard non-recursive mutex semantics and is not
    /// "fixed" by upgrading to recursion.
    Plain,
    /// Recursive lock: the owner may re-lock, and the underlying lock
    /// releases only when unlocks balance locks.
    Recursive,
}

/// Owner and recursion bookkeeping for a [`RawMutex`].
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// A mutex with explicit `lock`/`unlock` calls and optional recursion.
///
/// Unlike [`Mutex`], no data is attached and no guard enforces the unlock;
/// instead the lock tracks its owning thread identity, so an unlock by any
/// other thread (or an unbalanced extra unlock) fails with `InvalidState`.
pub struct RawMutex {
    kind: MutexKind,
    state: Mutex<LockState>,
    unlocked: Cond,
}

impl RawMutex {
    /// Creates a new unlocked mutex of the given kind.
    pub const fn new(kind: MutexKind) -> Self {
        RawMutex {
            kind,
            state: Mutex::new(LockState {
                owner: None,
                depth: 0,
            }),
            unlocked: Cond::new(),
        }
    }

    /// Acquires the lock, blocking until it is free.
    ///
    /// For a recursive mutex, a re-lock by the owning thread increments the
    /// recursion depth and returns immediately. For a plain mutex, a
    /// re-lock by the owning thread blocks forever (see [`MutexKind::Plain`]).
    ///
    /// # Errors
    ///
    /// `InvalidState` if the internal bookkeeping was poisoned.
    pub fn lock(&self) -> Result<()> {
        let me = thread::current();
        let mut state = self.state.lock()?;
        if self.kind == MutexKind::Recursive && state.owner == Some(me) {
            state.depth += 1;
            return Ok(());
        }
        while state.owner.is_some() {
            state = self.unlocked.wait(state)?;
        }
        state.owner = Some(me);
        state.depth = 1;
        Ok(())
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// # Errors
    ///
    /// `Busy` if another thread holds the lock (or the calling thread does,
    /// for a plain mutex); `InvalidState` on poisoned bookkeeping.
    pub fn try_lock(&self) -> Result<()> {
        let me = thread::current();
        let mut state = self.state.lock()?;
        match state.owner {
            Some(owner) if owner == me && self.kind == MutexKind::Recursive => {
                state.depth += 1;
                Ok(())
            }
            Some(_) => Err(ThreadError::Busy),
            None => {
                state.owner = Some(me);
                state.depth = 1;
                Ok(())
            }
        }
    }

    /// Releases one level of the lock.
    ///
    /// For a recursive mutex this decrements the recursion depth; the
    /// underlying lock releases only at depth zero.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the calling thread does not hold the lock — which
    /// includes one unlock too many after a full release.
    pub fn unlock(&self) -> Result<()> {
        let me = thread::current();
        let mut state = self.state.lock()?;
        if state.owner != Some(me) {
            return Err(ThreadError::InvalidState(
                "unlock by a thread that does not hold the mutex",
            ));
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            self.unlocked.signal();
        }
        Ok(())
    }

    /// Reports whether the calling thread currently holds the lock.
    pub fn held_by_current_thread(&self) -> Result<bool> {
        let state = self.state.lock()?;
        Ok(state.owner == Some(thread::current()))
    }
}

impl fmt::Debug for RawMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMutex").field("kind", &self.kind).finish()
    }
}
