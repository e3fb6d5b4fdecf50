//! Thread creation and identity primitives.
//!
//! A thin, uniform wrapper over the platform's native threads. [`Thread`]
//! owns a spawned thread until it is joined or detached; identity helpers
//! ([`current`], [`equal`]) and the scheduler hint [`yield_now`] are free
//! functions since they concern the calling thread, not a handle.

use std::thread::{self, JoinHandle, ThreadId};

use crate::{Result, ThreadError};

/// An owned handle to a spawned thread.
///
/// The handle is valid until [`join`](Thread::join) or
/// [`detach`](Thread::detach) consumes it; either operation on an
/// already-consumed handle fails with `InvalidState` rather than blocking
/// or panicking. Equality of threads is by identity (see [`equal`]), never
/// by value.
pub struct Thread<T> {
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> Thread<T> {
    /// Spawns a new OS thread running `f`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` if the OS cannot allocate thread state, or
    /// `System` for any other spawn failure.
    pub fn spawn<F>(f: F) -> Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = thread::Builder::new()
            .spawn(f)
            .map_err(ThreadError::from_spawn)?;
        Ok(Thread {
            handle: Some(handle),
        })
    }

    /// Spawns a new named OS thread running `f`.
    ///
    /// The name shows up in debuggers and panic messages. It must not
    /// contain interior null bytes.
    pub fn spawn_named<F>(name: impl Into<String>, f: F) -> Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(f)
            .map_err(ThreadError::from_spawn)?;
        Ok(Thread {
            handle: Some(handle),
        })
    }
}

impl<T> Thread<T> {
    /// Blocks until the thread terminates and returns its exit value.
    ///
    /// The exit value is returned exactly once.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the handle was already joined or detached, or if
    /// the target thread panicked instead of returning a value.
    pub fn join(&mut self) -> Result<T> {
        let handle = self
            .handle
            .take()
            .ok_or(ThreadError::InvalidState("thread already joined or detached"))?;
        handle
            .join()
            .map_err(|_| ThreadError::InvalidState("joined thread panicked"))
    }

    /// Marks the thread as self-cleaning.
    ///
    /// Its resources are reclaimed automatically when it exits; the handle
    /// becomes invalid for future `join`/`detach` calls.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the handle was already joined or detached.
    pub fn detach(&mut self) -> Result<()> {
        self.handle
            .take()
            .map(drop)
            .ok_or(ThreadError::InvalidState("thread already joined or detached"))
    }

    /// Identity of the target thread, while the handle is live.
    ///
    /// Returns `None` once the handle has been joined or detached.
    pub fn id(&self) -> Option<ThreadId> {
        self.handle.as_ref().map(|h| h.thread().id())
    }
}

/// Returns the identity of the calling thread.
pub fn current() -> ThreadId {
    thread::current().id()
}

/// Compares two thread identities. Never blocks.
pub fn equal(a: ThreadId, b: ThreadId) -> bool {
    a == b
}

/// Cooperatively yields the calling thread's timeslice.
///
/// A hint to the scheduler only; correctness never depends on it.
pub fn yield_now() {
    thread::yield_now();
}
