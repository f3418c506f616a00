//! Detached evaluation context.

use std::cell::Cell;

thread_local! {
    static DETACHED: Cell<bool> = const { Cell::new(false) };
}

struct Restore(bool);

impl Drop for Restore {
    fn drop(&mut self) {
        DETACHED.with(|d| d.set(self.0));
    }
}

/// Run `f` with entity loading disabled on this thread.
///
/// Nests, and restores the previous state even if `f` panics.
pub fn detached<T>(f: impl FnOnce() -> T) -> T {
    let previous = DETACHED.with(|d| d.replace(true));
    let _restore = Restore(previous);
    f()
}

pub fn is_detached() -> bool {
    DETACHED.with(Cell::get)
}
