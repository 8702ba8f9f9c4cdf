//! Debug-only reentrancy guard for engine critical sections.
//!
//! Policy hooks run while the engine is mid-probe. A hook that re-enters the
//! same table (through a raw pointer, say) would observe it in a transient
//! state, so debug builds panic on nested entry and name both operations.
//! Release builds compile the guard away.

use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // Single-threaded: keep !Send + !Sync.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Mark `op` as running until the returned guard drops.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        if let Some(outer) = self.active.replace(Some(op)) {
            panic!("reentrancy detected: `{op}` entered while `{outer}` is running");
        }
        #[cfg(not(debug_assertions))]
        let _ = op;
        ReentrancyGuard::new(self)
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl<'a> ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    fn new(owner: &'a DebugReentrancy) -> Self {
        Self { owner }
    }

    #[cfg(not(debug_assertions))]
    fn new(_owner: &'a DebugReentrancy) -> Self {
        Self { _z: PhantomData }
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let prev = self.owner.active.take();
            debug_assert!(prev.is_some());
        }
    }
}
