//! Mutual exclusion, condition variables, and one-time initialization.
//!
//! Two renditions of the mutex live here, split the way the standard
//! library splits them: [`Mutex`] is the RAII, data-owning form the rest of
//! the crate builds on, while [`RawMutex`] exposes explicit
//! `lock`/`unlock` with optional recursion for callers porting lock-based
//! code. [`Cond`] pairs with [`Mutex`] guards; [`Once`] provides one-time
//! initialization.

mod cond;
mod mutex;
mod once;

pub use self::cond::Cond;
pub use self::mutex::{Mutex, MutexGuard, MutexKind, RawMutex};
pub use self::once::Once;
