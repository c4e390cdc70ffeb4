//! Interchangeable mutual-exclusion strategies with the chain's
//! `run(handle, action) -> handle` shape.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_queue::SegQueue;

use crate::chain::ActionChain;
use crate::pool::Mem;
use crate::util::WaitBudget;

/// A way of running actions one at a time.
///
/// # Safety
/// Implementations must run every submitted action exactly once, never two
/// at the same time, with each action's effects visible to the next, and
/// must have run all of them once [`quiesce`](Self::quiesce) returns.
pub unsafe trait Strategy<'a>: Sync {
    /// Per-worker state threaded from one call to the next.
    type Handle: Default + Send;

    /// Run or queue `action`.
    fn run<F>(&self, handle: Self::Handle, action: F) -> Self::Handle
    where
        F: FnOnce() + Send + 'a;

    /// Wait until every action submitted so far has run.
    fn quiesce(&self) {}
}

/// The action chain, threading an explicit [`Mem`] through each worker.
#[derive(Default)]
pub struct Pooled<'a> {
    chain: ActionChain<'a>,
}

// Safety: the chain's own guarantees; every `run` has returned by the time
// workers join, and nothing is pending after that.
unsafe impl<'a> Strategy<'a> for Pooled<'a> {
    type Handle = Mem;

    #[inline]
    fn run<F>(&self, handle: Mem, action: F) -> Mem
    where
        F: FnOnce() + Send + 'a,
    {
        self.chain.run_with(handle, action)
    }
}

/// The action chain, pooling through the per-thread cache.
#[derive(Default)]
pub struct ThreadPooled<'a> {
    chain: ActionChain<'a>,
}

// Safety: as for `Pooled`.
unsafe impl<'a> Strategy<'a> for ThreadPooled<'a> {
    type Handle = ();

    #[inline]
    fn run<F>(&self, _: (), action: F)
    where
        F: FnOnce() + Send + 'a,
    {
        self.chain.run(action);
    }
}

/// The action chain, allocating and freeing a node for every action.
#[derive(Default)]
pub struct Unpooled<'a> {
    chain: ActionChain<'a>,
}

// Safety: as for `Pooled`.
unsafe impl<'a> Strategy<'a> for Unpooled<'a> {
    type Handle = ();

    #[inline]
    fn run<F>(&self, _: (), action: F)
    where
        F: FnOnce() + Send + 'a,
    {
        drop(self.chain.run_with(Mem::new(), action));
    }
}

/// A `std::sync::Mutex` held around each action.
#[derive(Default)]
pub struct Locked {
    lock: Mutex<()>,
}

// Safety: the mutex serializes actions, which run inline.
unsafe impl<'a> Strategy<'a> for Locked {
    type Handle = ();

    #[inline]
    fn run<F>(&self, _: (), action: F)
    where
        F: FnOnce() + Send + 'a,
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        action();
    }
}

/// A test-and-test-and-set spin lock with a [`WaitBudget`] backoff.
#[derive(Default)]
pub struct Spin {
    locked: AtomicBool,
}

struct SpinGuard<'s>(&'s AtomicBool);

impl Drop for SpinGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Spin {
    #[inline]
    fn lock(&self) -> SpinGuard<'_> {
        let mut budget = WaitBudget::hot();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                budget.step();
            }
        }
        SpinGuard(&self.locked)
    }
}

// Safety: the lock serializes actions, which run inline.
unsafe impl<'a> Strategy<'a> for Spin {
    type Handle = ();

    #[inline]
    fn run<F>(&self, _: (), action: F)
    where
        F: FnOnce() + Send + 'a,
    {
        let _guard = self.lock();
        action();
    }
}

type Job<'a> = Box<dyn FnOnce() + Send + 'a>;

/// A dedicated worker thread that owns the critical section and drains
/// boxed actions from a lock-free queue.
///
/// Call [`serve`](Self::serve) on the worker thread and
/// [`shutdown`](Self::shutdown) once submitters are done.
#[derive(Default)]
pub struct Trustee<'a> {
    queue: SegQueue<Job<'a>>,
    submitted: AtomicU64,
    completed: AtomicU64,
    stop: AtomicBool,
}

impl<'a> Trustee<'a> {
    /// Run queued actions until [`shutdown`](Self::shutdown) is called and
    /// the queue is empty.
    pub fn serve(&self) {
        let mut budget = WaitBudget::idle();
        loop {
            if let Some(job) = self.queue.pop() {
                job();
                self.completed.fetch_add(1, Ordering::Release);
                budget.reset();
            } else if self.stop.load(Ordering::Acquire) && self.queue.is_empty() {
                return;
            } else {
                budget.step();
            }
        }
    }

    /// Ask [`serve`](Self::serve) to return once the queue is empty.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

// Safety: only the serving thread pops and runs jobs, in queue order.
unsafe impl<'a> Strategy<'a> for Trustee<'a> {
    type Handle = ();

    #[inline]
    fn run<F>(&self, _: (), action: F)
    where
        F: FnOnce() + Send + 'a,
    {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.queue.push(Box::new(action));
    }

    fn quiesce(&self) {
        WaitBudget::idle().wait_until(|| {
            self.completed.load(Ordering::Acquire) == self.submitted.load(Ordering::Relaxed)
        });
    }
}
