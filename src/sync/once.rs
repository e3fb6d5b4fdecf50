use std::sync;

/// One-time initialization control.
///
/// The init function passed to [`call`](Once::call) runs exactly once
/// across all concurrent callers sharing the same `Once`; every caller
/// blocks until that first execution completes, after which `call` is a
/// no-op. `new` is `const`, so a `Once` can live in a `static` in its
/// "not yet run" state.
pub struct Once {
    inner: sync::Once,
}

impl Once {
    /// Creates a control in the "not yet run" state.
    pub const fn new() -> Self {
        Once {
            inner: sync::Once::new(),
        }
    }

    /// Runs `init` if and only if no call through this control has run it
    /// before, blocking until the winning call finishes.
    pub fn call<F: FnOnce()>(&self, init: F) {
        self.inner.call_once(init);
    }

    /// Reports whether the init function has run to completion.
    pub fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }
}

impl Default for Once {
    fn default() -> Self {
        Self::new()
    }
}
