//! Thread-local storage keys with per-thread destructors.
//!
//! A [`TlsKey`] is a process-wide identifier mapping to one machine-word
//! value per thread. Keys live in an append-only global registry guarded by
//! its own lock (deliberately distinct from any pool lock, so there is no
//! nested-lock ordering to get wrong); values live in per-thread slot
//! tables. A key's optional destructor runs exactly once per thread, on
//! that thread's own exit path, and only for threads that set a non-zero
//! value for the key.

use std::cell::RefCell;

use crate::sync::Mutex;
use crate::{Result, ThreadError};

/// Destructor invoked on thread exit with the slot's last non-zero value.
pub type TlsDestructor = fn(usize);

/// Append-only registry of key destructors. Keys are never deleted.
static REGISTRY: Mutex<Vec<Option<TlsDestructor>>> = Mutex::new(Vec::new());

thread_local! {
    static SLOTS: RefCell<SlotTable> = RefCell::new(SlotTable { values: Vec::new() });
}

/// A process-wide thread-local storage key.
///
/// Copyable and shareable between threads; the value each thread observes
/// through it is private to that thread. Value `0` means "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsKey {
    index: usize,
}

impl TlsKey {
    /// Registers a new key with an optional per-thread destructor.
    ///
    /// Registration is append-only for the lifetime of the process.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the key registry lock was poisoned.
    pub fn new(destructor: Option<TlsDestructor>) -> Result<TlsKey> {
        let mut registry = REGISTRY.lock()?;
        registry.push(destructor);
        Ok(TlsKey {
            index: registry.len() - 1,
        })
    }

    /// Sets the calling thread's value for this key.
    ///
    /// Setting `0` clears the slot; the destructor will not run for a
    /// cleared slot.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the calling thread's slot table is already being
    /// torn down (i.e. this call came from inside thread exit).
    pub fn set(&self, value: usize) -> Result<()> {
        SLOTS
            .try_with(|slots| {
                let mut slots = slots.borrow_mut();
                if slots.values.len() <= self.index {
                    slots.values.resize(self.index + 1, 0);
                }
                slots.values[self.index] = value;
            })
            .map_err(|_| {
                ThreadError::InvalidState("thread-local storage unavailable during thread exit")
            })
    }

    /// Returns the calling thread's value for this key.
    ///
    /// An unset key reads as `0` — an absent value, not an error.
    pub fn get(&self) -> usize {
        SLOTS
            .try_with(|slots| slots.borrow().values.get(self.index).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

/// Per-thread slot values; the `Drop` impl is the thread's exit path.
struct SlotTable {
    values: Vec<usize>,
}

impl Drop for SlotTable {
    fn drop(&mut self) {
        let values = std::mem::take(&mut self.values);

        // Snapshot the destructors and release the registry lock before
        // invoking any of them, so a destructor may itself create keys.
        let destructors: Vec<(TlsDestructor, usize)> = {
            let Ok(registry) = REGISTRY.lock() else {
                return;
            };
            values
                .iter()
                .enumerate()
                .filter(|&(_, &value)| value != 0)
                .filter_map(|(index, &value)| {
                    registry.get(index).copied().flatten().map(|d| (d, value))
                })
                .collect()
        };

        for (destructor, value) in destructors {
            destructor(value);
        }
    }
}
