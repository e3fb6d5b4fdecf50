#![deny(missing_docs)]

//! A portable threading toolkit with an elastic worker thread pool.
//!
//! The crate is two layers. The primitive layer is a thin, uniform wrapper
//! over native OS threading: thread creation and identity ([`thread`]),
//! mutexes and condition variables and one-time initialization ([`sync`]),
//! and thread-local storage keys with per-thread destructors ([`tls`]).
//! The [`pool`] layer builds a dynamically-sized worker pool entirely on
//! top of it: a mutex-guarded FIFO queue serviced by workers that spawn on
//! demand and shrink back after an idle linger period.
//!
//! Every fallible operation returns a [`Result`] over a small closed error
//! taxonomy ([`ThreadError`]); nothing here raises control-flow exceptions.
//! Operational tracing goes through the `log` facade and is silent unless
//! the embedding application installs a logger.

mod error;
pub mod pool;
pub mod sync;
pub mod thread;
pub mod tls;

pub use error::{Result, ThreadError};
pub use pool::{JobTicket, ThreadPool, DEFAULT_LINGER};
pub use sync::{Cond, Mutex, MutexGuard, MutexKind, Once, RawMutex};
pub use thread::Thread;
pub use tls::{TlsDestructor, TlsKey};
