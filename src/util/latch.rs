use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// One-shot gate, optionally carrying a value from the opener to the waiter.
///
/// Clones share one gate. The opener should hold its own clone: the gate
/// then stays alive until `open` has returned even if the waiter has already
/// woken and gone. Poisoning is ignored; the guarded state stays meaningful.
pub struct Latch<T = ()> {
    shared: Arc<Gate<T>>,
}

struct Gate<T> {
    state: Mutex<State<T>>,
    cvar: Condvar,
}

struct State<T> {
    open: bool,
    value: Option<T>,
}

impl Latch {
    /// Create a closed latch that carries no value.
    pub fn new() -> Self {
        Self::with_slot()
    }
}

impl<T> Latch<T> {
    /// Create a closed latch whose opener can hand over a `T`.
    pub fn with_slot() -> Self {
        Self {
            shared: Arc::new(Gate {
                state: Mutex::new(State {
                    open: false,
                    value: None,
                }),
                cvar: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the latch and wake every waiter. A value already set stays.
    pub fn open(&self) {
        let mut state = self.lock();
        state.open = true;
        // Notify under the lock: a waiter cannot return before we let go.
        self.shared.cvar.notify_all();
    }

    /// Store `value` for the waiter and open the latch.
    pub fn set(&self, value: T) {
        let mut state = self.lock();
        state.value = Some(value);
        state.open = true;
        self.shared.cvar.notify_all();
    }

    /// Has the latch been opened?
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Block until the latch is open, then take the value it carries, if
    /// any. Later waiters see `None`.
    pub fn wait(&self) -> Option<T> {
        let mut state = self.lock();
        while !state.open {
            state = self
                .shared
                .cvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.value.take()
    }
}

impl<T> Clone for Latch<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Latch<T> {
    fn default() -> Self {
        Self::with_slot()
    }
}
