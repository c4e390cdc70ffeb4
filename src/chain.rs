//! [`ActionChain`]: a wait-free, ordered queue of actions that run one at a
//! time, as if each held the same mutex, without any submitter ever blocking.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};

use crate::node::{self, Header, Link};
use crate::pool::{Block, Mem, local};
use crate::sync::atomic::{AtomicPtr, Ordering};
use crate::util::{Latch, scope};

/// Ordered, mutually exclusive execution of short actions.
///
/// [`run`](Self::run) either executes the action on the calling thread (and
/// possibly actions other threads queued meanwhile) or leaves it for the
/// thread currently running the chain. Actions run exactly once, one at a
/// time, in the order their submissions exchanged the tail.
///
/// Actions may borrow data that lives for `'a`. Dropping the chain waits for
/// every submitted action to finish.
///
/// ```
/// use action_chain::ActionChain;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let hits = AtomicU64::new(0);
/// let chain = ActionChain::new();
/// std::thread::scope(|s| {
///     for _ in 0..4 {
///         s.spawn(|| {
///             for _ in 0..1000 {
///                 chain.run(|| {
///                     hits.fetch_add(1, Ordering::Relaxed);
///                 });
///             }
///         });
///     }
/// });
/// drop(chain);
/// assert_eq!(hits.into_inner(), 4000);
/// ```
///
/// Actions must fit inline in a node block; larger ones do not compile:
///
/// ```compile_fail
/// use action_chain::ActionChain;
///
/// let chain = ActionChain::new();
/// let big = [0u8; 256];
/// chain.run(move || drop(big));
/// ```
pub struct ActionChain<'a> {
    // Never null: starts at a sealed dummy node.
    tail: AtomicPtr<Header>,
    // Invariant in 'a so queued actions cannot outlive what they borrow.
    _actions: PhantomData<fn(&'a ()) -> &'a ()>,
}

impl<'a> ActionChain<'a> {
    /// Create an idle chain; the first submission runs synchronously.
    pub fn new() -> Self {
        let dummy = Header::create(Block::alloc(), || {});
        // Safety: nobody else can reach the dummy; running it seals it. No
        // chain owns it yet, so it runs under a null owner.
        unsafe { node::run_backlog(dummy, &mut None, 0) };
        Self {
            tail: AtomicPtr::new(dummy.as_ptr()),
            _actions: PhantomData,
        }
    }

    /// Submit `action`, pooling node storage through a per-thread cache.
    ///
    /// If the chain is idle the action runs before this returns.
    #[inline]
    pub fn run<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'a,
    {
        // Safety: F: 'a and 'a outlives the chain, which drains on drop.
        unsafe { self.run_unchecked(action) }
    }

    /// Submit `action`, building its node in `mem`'s block when it holds one.
    ///
    /// Returns the block freed by the last node this call retired, ready to
    /// pass to the next submission. An empty handle means the action was only
    /// queued, or nothing was reclaimed.
    #[inline]
    pub fn run_with<F>(&self, mem: Mem, action: F) -> Mem
    where
        F: FnOnce() + Send + 'a,
    {
        // Safety: F: 'a and 'a outlives the chain, which drains on drop.
        unsafe { self.submit(mem, action) }
    }

    /// [`run`](Self::run) without the lifetime bound on `action`.
    ///
    /// # Safety
    /// Everything `action` borrows must stay alive until it has run.
    #[inline]
    pub(crate) unsafe fn run_unchecked<F>(&self, action: F)
    where
        F: FnOnce() + Send,
    {
        local::put(unsafe { self.submit(local::take(), action) });
    }

    /// # Safety
    /// Everything `action` borrows must stay alive until it has run.
    #[inline]
    unsafe fn submit<F>(&self, mem: Mem, action: F) -> Mem
    where
        F: FnOnce() + Send,
    {
        let node = Header::create(mem.into_block(), action);
        let prev = self.tail.swap(node.as_ptr(), Ordering::AcqRel);
        // Safety: the tail is never null, and we displaced it so it is ours
        // to link behind.
        let reclaimed = unsafe { node::hand_off(NonNull::new_unchecked(prev), node, self.id()) };
        Mem::from_block(reclaimed)
    }

    /// Is the calling thread in the middle of running this chain's actions?
    ///
    /// Blocking on the chain's progress from such a thread would never
    /// return.
    #[inline]
    pub fn is_running_here(&self) -> bool {
        scope::is_running(self.id())
    }

    // A chain cannot move while borrowed, so its address is stable for as
    // long as anything runs on it.
    #[inline]
    fn id(&self) -> usize {
        ptr::from_ref(self).addr()
    }
}

impl Default for ActionChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActionChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionChain")
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}

impl Drop for ActionChain<'_> {
    fn drop(&mut self) {
        // `&mut self` means every `run` has returned, and with it every
        // backlog its caller was draining. The marker therefore finds the
        // chain sealed and runs inline, and the wait returns at once.
        let drained = Latch::new();
        let marker = drained.clone();
        // Safety: the marker owns everything it touches.
        let mem = unsafe { self.submit(Mem::new(), move || marker.open()) };
        drop(mem);
        debug_assert!(drained.is_open(), "drain marker was left queued");
        drained.wait();
        tracing::trace!("action chain drained");

        let tail = self.tail.load(Ordering::Acquire);
        // Safety: the tail is never null.
        let tail = unsafe { NonNull::new_unchecked(tail) };
        debug_assert_eq!(unsafe { Header::next(tail) }.load(), Link::Sealed);
        // Safety: the marker ran and sealed without a successor, and no
        // submission can race a `&mut self`.
        drop(unsafe { Header::retire(tail) });
    }
}
