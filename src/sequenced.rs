//! A value whose every mutation goes through an [`ActionChain`].

use core::cell::UnsafeCell;
use core::fmt;

use crate::chain::ActionChain;
use crate::pool::Mem;
use crate::util::Latch;

/// A `T` mutated only by actions serialized through one chain.
///
/// The lock-free counterpart of `Mutex<T>` for write-mostly state such as
/// counters and metrics: [`apply`](Self::apply) never blocks, and the
/// closure runs with exclusive access to the value at some point after
/// every previously applied closure.
///
/// ```
/// use action_chain::Sequenced;
///
/// let total = Sequenced::new(0u64);
/// std::thread::scope(|s| {
///     for _ in 0..4 {
///         s.spawn(|| {
///             for _ in 0..1000 {
///                 total.apply(|t| *t += 1);
///             }
///         });
///     }
/// });
/// assert_eq!(total.into_inner(), 4000);
/// ```
pub struct Sequenced<'a, T> {
    // Declared first: dropping the chain drains it before `value` goes away.
    chain: ActionChain<'a>,
    value: UnsafeCell<T>,
}

// Safety: the value is only touched by actions, which the chain runs one at
// a time, possibly on any submitting thread.
unsafe impl<T: Send> Sync for Sequenced<'_, T> {}

struct ValuePtr<T>(*mut T);

// Safety: only dereferenced inside chain actions, which are exclusive.
unsafe impl<T: Send> Send for ValuePtr<T> {}

impl<T> ValuePtr<T> {
    // Method access makes closures capture the whole (Send) wrapper rather
    // than the raw pointer field.
    #[inline]
    fn get(&self) -> *mut T {
        self.0
    }
}

// Opens the latch even when the action unwinds, so waiters never hang.
struct OpenOnDrop<R>(Latch<R>);

impl<R> Drop for OpenOnDrop<R> {
    fn drop(&mut self) {
        self.0.open();
    }
}

impl<'a, T: Send + 'a> Sequenced<'a, T> {
    /// Wrap `value` behind a fresh chain.
    pub fn new(value: T) -> Self {
        Self {
            chain: ActionChain::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Apply `f` to the value, now if the chain is idle, otherwise after
    /// everything already queued.
    #[inline]
    pub fn apply<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'a,
    {
        let value = ValuePtr(self.value.get());
        // Safety: exclusive while the action runs; the value outlives the chain.
        self.chain.run(move || f(unsafe { &mut *value.get() }));
    }

    /// Like [`apply`](Self::apply) with an explicit pool handle.
    #[inline]
    pub fn apply_with<F>(&self, mem: Mem, f: F) -> Mem
    where
        F: FnOnce(&mut T) + Send + 'a,
    {
        let value = ValuePtr(self.value.get());
        self.chain.run_with(mem, move || f(unsafe { &mut *value.get() }))
    }

    /// Apply `f` and block until it has run, returning its result.
    ///
    /// # Panics
    /// When called from inside one of this value's own actions, since the
    /// call would wait on a backlog only this thread can advance. Also when
    /// `f` panics.
    pub fn apply_wait<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R + Send + 'a,
        R: Send,
    {
        assert!(
            !self.chain.is_running_here(),
            "Sequenced::apply_wait called from inside one of its own actions"
        );
        let done = Latch::with_slot();
        let reply = OpenOnDrop(done.clone());
        let value = ValuePtr(self.value.get());
        // Boxed so that any `F` fits inline in a node.
        let action = Box::new(move || {
            let reply = reply;
            reply.0.set(f(unsafe { &mut *value.get() }));
        });
        // Safety: besides its own latch clone, the action borrows
        // `self.value` and whatever `f` holds for `'a`, all of which outlive
        // the wait below.
        unsafe { self.chain.run_unchecked(action) };
        match done.wait() {
            Some(result) => result,
            None => panic!("action passed to Sequenced::apply_wait panicked"),
        }
    }

    /// Mutable access without queuing; `&mut self` proves nothing is pending.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Drain the chain and return the value.
    pub fn into_inner(self) -> T {
        let Self { chain, value } = self;
        drop(chain);
        value.into_inner()
    }
}

impl<'a, T: Send + Default + 'a> Default for Sequenced<'a, T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Sequenced<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequenced").finish_non_exhaustive()
    }
}
