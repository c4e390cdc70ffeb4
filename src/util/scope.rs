//! Marks the stretch of code where the current thread is draining a backlog,
//! and for which chains.
//!
//! Blocking on a chain from inside one of that chain's own actions can never
//! complete, so blocking entry points consult this first.

use core::cell::RefCell;

thread_local! {
    // Chains whose backlog this thread is draining, innermost last.
    static RUNNING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Returns true while the calling thread is running queued actions of any
/// chain.
pub fn is_running_actions() -> bool {
    RUNNING
        .try_with(|running| !running.borrow().is_empty())
        .unwrap_or(false)
}

/// Is the calling thread currently draining the chain identified by `owner`?
pub(crate) fn is_running(owner: usize) -> bool {
    RUNNING
        .try_with(|running| running.borrow().contains(&owner))
        .unwrap_or(false)
}

/// Guard held for the duration of one backlog drain. Nests.
pub(crate) struct RunnerScope {
    owner: usize,
}

impl RunnerScope {
    #[inline]
    pub(crate) fn enter(owner: usize) -> Self {
        let _ = RUNNING.try_with(|running| running.borrow_mut().push(owner));
        Self { owner }
    }
}

impl Drop for RunnerScope {
    #[inline]
    fn drop(&mut self) {
        let _ = RUNNING.try_with(|running| {
            let mut running = running.borrow_mut();
            if let Some(at) = running.iter().rposition(|&c| c == self.owner) {
                running.remove(at);
            }
        });
    }
}
