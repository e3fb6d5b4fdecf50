use std::io;
use thiserror::Error;

/// Error type for threadkit operations.
///
/// This is a deliberately small, closed taxonomy: every fallible operation
/// in the crate reports one of these outcomes instead of panicking, and
/// callers are expected to check every result.
#[derive(Error, Debug)]
pub enum ThreadError {
    /// A timed wait elapsed without the awaited event occurring.
    #[error("operation timed out")]
    Timeout,

    /// A non-blocking lock attempt found the lock held by another thread.
    #[error("resource busy")]
    Busy,

    /// The OS could not allocate resources for a new thread.
    #[error("out of memory")]
    OutOfMemory,

    /// An opaque OS-level failure.
    #[error("system error: {0}")]
    System(#[from] io::Error),

    /// The operation is not valid in the object's current state, e.g. a
    /// double join, an unlock by a thread that does not hold the lock, or
    /// an enqueue into a terminating pool.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

impl ThreadError {
    /// Classifies a thread-spawn failure.
    ///
    /// Resource exhaustion (the OS refusing to create more threads) is
    /// reported as `OutOfMemory`; anything else stays a `System` error.
    pub(crate) fn from_spawn(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::OutOfMemory | io::ErrorKind::WouldBlock => ThreadError::OutOfMemory,
            _ => ThreadError::System(err),
        }
    }
}

/// Result type alias for threadkit operations.
pub type Result<T> = std::result::Result<T, ThreadError>;
