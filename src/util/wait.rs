/// Bounded busy-wait: exponential spin backoff, then yield to the scheduler.
/// Never parks.
///
/// Used by the comparison strategies in [`harness`](crate::harness); the
/// chain itself never waits.
#[derive(Copy, Clone, Debug)]
pub struct WaitBudget {
    step: u32,
    spin_limit: u32,
}

impl WaitBudget {
    /// Short critical sections under heavy contention: spin longer before
    /// giving the core away.
    #[inline]
    pub const fn hot() -> Self {
        Self::spinning_for(7)
    }

    /// Idle polling: a few spins, then yield on every step.
    #[inline]
    pub const fn idle() -> Self {
        Self::spinning_for(3)
    }

    /// Spin with doubling backoff for `spin_limit` steps, then yield.
    #[inline]
    const fn spinning_for(spin_limit: u32) -> Self {
        Self {
            step: 0,
            spin_limit,
        }
    }

    /// Has the spin phase run out?
    #[inline]
    pub fn is_yielding(&self) -> bool {
        self.step >= self.spin_limit
    }

    /// Start over after making progress.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Wait one step.
    #[inline]
    pub fn step(&mut self) {
        if self.is_yielding() {
            std::thread::yield_now();
            return;
        }
        for _ in 0..1u32 << self.step {
            core::hint::spin_loop();
        }
        self.step += 1;
    }

    /// Step until `done` returns true.
    #[inline]
    pub fn wait_until(mut self, mut done: impl FnMut() -> bool) {
        while !done() {
            self.step();
        }
    }
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self::spinning_for(5)
    }
}
