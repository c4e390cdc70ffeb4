//! Throughput harness: T workers each submit K actions that bump one shared,
//! non-atomic tally through the strategy under test, then the tally is
//! checked against T*K.

use core::cell::UnsafeCell;
use core::fmt;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::util::{PinConfig, pin_current_thread};

/// Flag parsing and run configuration.
pub mod flags;
/// Strategies sharing the `run(handle, action)` shape.
pub mod strategy;

pub use flags::{BenchConfig, FlagError, StrategyKind, parse_count};
pub use strategy::Strategy;

/// Errors from a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// The tally disagrees with the number of actions submitted: some action
    /// was lost, repeated, or raced another.
    #[error("{strategy}: tally is {observed}, expected {expected}")]
    Miscount {
        /// Strategy that produced the bad tally.
        strategy: StrategyKind,
        /// Actions submitted.
        expected: u64,
        /// Tally after all workers joined.
        observed: u64,
    },
}

/// Outcome of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Strategy measured.
    pub strategy: StrategyKind,
    /// Worker threads.
    pub threads: usize,
    /// Actions submitted in total.
    pub actions: u64,
    /// Wall time from the first submission until every action had run.
    pub elapsed: Duration,
}

impl Report {
    /// Actions completed per second of wall time.
    pub fn actions_per_second(&self) -> f64 {
        self.actions as f64 / self.elapsed.as_secs_f64()
    }

    /// Mean wall time per action in nanoseconds.
    pub fn nanos_per_action(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1e9 / self.actions as f64
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Strategy: {}", self.strategy)?;
        writeln!(f, "Actions: {}", self.actions)?;
        writeln!(f, "Threads: {}", self.threads)?;
        writeln!(
            f,
            "Actions per thread: {}",
            self.actions / self.threads.max(1) as u64
        )?;
        writeln!(f, "Total wall time (s): {:.6}", self.elapsed.as_secs_f64())?;
        writeln!(f, "Actions per second: {:.0}", self.actions_per_second())?;
        write!(f, "Time per action (ns): {:.2}", self.nanos_per_action())
    }
}

/// The shared, deliberately non-atomic counter every action bumps.
#[derive(Default)]
struct Tally(UnsafeCell<u64>);

// Safety: only bumped from inside strategy actions, which never overlap.
unsafe impl Sync for Tally {}

impl Tally {
    /// # Safety
    /// No other access may overlap this one.
    #[inline]
    unsafe fn bump(&self) {
        unsafe { *self.0.get() += 1 };
    }

    fn into_inner(self) -> u64 {
        self.0.into_inner()
    }
}

/// Run `cfg` once and check the tally.
pub fn measure(cfg: &BenchConfig) -> Result<Report, HarnessError> {
    let tally = Tally::default();
    info!(
        strategy = %cfg.strategy,
        threads = cfg.threads,
        actions = cfg.total_actions(),
        pin = cfg.pin,
        "starting run"
    );
    let elapsed = match cfg.strategy {
        StrategyKind::Chain => drive(&strategy::Pooled::default(), &tally, cfg),
        StrategyKind::ChainLocal => drive(&strategy::ThreadPooled::default(), &tally, cfg),
        StrategyKind::ChainUnpooled => drive(&strategy::Unpooled::default(), &tally, cfg),
        StrategyKind::Mutex => drive(&strategy::Locked::default(), &tally, cfg),
        StrategyKind::Spin => drive(&strategy::Spin::default(), &tally, cfg),
        StrategyKind::Trustee => {
            let trustee = strategy::Trustee::default();
            thread::scope(|s| {
                s.spawn(|| trustee.serve());
                let elapsed = drive(&trustee, &tally, cfg);
                trustee.shutdown();
                elapsed
            })
        }
    };

    let expected = cfg.total_actions();
    let observed = tally.into_inner();
    if observed != expected {
        return Err(HarnessError::Miscount {
            strategy: cfg.strategy,
            expected,
            observed,
        });
    }
    Ok(Report {
        strategy: cfg.strategy,
        threads: cfg.threads,
        actions: expected,
        elapsed,
    })
}

fn drive<'a, S: Strategy<'a>>(strategy: &S, tally: &'a Tally, cfg: &BenchConfig) -> Duration {
    let per_thread = cfg.actions_per_thread();
    let start = Instant::now();
    thread::scope(|s| {
        for worker in 0..cfg.threads {
            s.spawn(move || {
                if cfg.pin && !pin_current_thread(&PinConfig::core(worker)) {
                    debug!(worker, "pinning not applied");
                }
                let mut handle = S::Handle::default();
                for _ in 0..per_thread {
                    // Safety: the strategy never runs two actions at once.
                    handle = strategy.run(handle, move || unsafe { tally.bump() });
                }
            });
        }
    });
    strategy.quiesce();
    start.elapsed()
}
