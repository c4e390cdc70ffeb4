//! Lifecycle:
//! - created lazily, empty, the first time a thread submits through
//!   [`ActionChain::run`](crate::ActionChain::run);
//! - refilled by every synchronous submission on that thread;
//! - dropped at thread exit, freeing any cached block.
//!
//! Once thread-local storage is torn down both accessors fall back to the
//! unpooled path instead of panicking.

use core::cell::Cell;

use super::Mem;

thread_local! {
    static CACHED: Cell<Mem> = const { Cell::new(Mem::new()) };
}

/// Take the calling thread's cached block, leaving the cache empty.
#[inline]
pub(crate) fn take() -> Mem {
    CACHED.try_with(Cell::take).unwrap_or_default()
}

/// Store `mem` as the calling thread's cached block.
#[inline]
pub(crate) fn put(mem: Mem) {
    if mem.is_empty() {
        return;
    }
    // A nested submission may have refilled the cache meanwhile; `set` frees
    // the block it replaces.
    let _ = CACHED.try_with(move |cached| cached.set(mem));
}

/// Free the calling thread's cached block now rather than at thread exit.
pub fn clear_thread_cache() {
    drop(take());
}
