//! Command-line flags for the benchmark harness.
//!
//! Counts accept a `K`, `M` or `G` suffix meaning 2^10, 2^20 and 2^30, so
//! `--actions=128M` queues 134217728 actions.

use core::fmt;
use core::str::FromStr;

/// Errors produced while reading harness flags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagError {
    /// A flag the harness does not know.
    #[error("unknown flag `{0}`")]
    Unknown(String),
    /// A flag that needs a value was last on the command line.
    #[error("flag `--{0}` expects a value")]
    MissingValue(&'static str),
    /// A count that is not digits followed by an optional suffix.
    #[error("invalid count `{0}`: expected digits with an optional K, M or G suffix")]
    InvalidCount(String),
    /// A count too large for 64 bits once the suffix is applied.
    #[error("count `{0}` overflows")]
    Overflow(String),
    /// A strategy name the harness does not know.
    #[error("unknown strategy `{0}`; expected one of: {names}", names = StrategyKind::NAMES.join(", "))]
    UnknownStrategy(String),
    /// Zero worker threads.
    #[error("at least one thread is required")]
    NoThreads,
    /// Fewer actions than threads, so no worker would submit any.
    #[error("{actions} actions cannot be split across {threads} threads")]
    NoActions {
        /// Requested total.
        actions: u64,
        /// Requested worker threads.
        threads: usize,
    },
}

/// Parse a count such as `1000`, `64K`, `128M` or `2g`.
pub fn parse_count(text: &str) -> Result<u64, FlagError> {
    let (digits, shift) = match text.as_bytes().last() {
        Some(b'k' | b'K') => (&text[..text.len() - 1], 10),
        Some(b'm' | b'M') => (&text[..text.len() - 1], 20),
        Some(b'g' | b'G') => (&text[..text.len() - 1], 30),
        _ => (text, 0),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FlagError::InvalidCount(text.to_owned()));
    }
    let base: u64 = digits
        .parse()
        .map_err(|_| FlagError::Overflow(text.to_owned()))?;
    base.checked_mul(1u64 << shift)
        .ok_or_else(|| FlagError::Overflow(text.to_owned()))
}

/// Which synchronization strategy a run measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Action chain with an explicit pool handle per worker.
    #[default]
    Chain,
    /// Action chain pooling through the per-thread cache.
    ChainLocal,
    /// Action chain allocating a fresh node for every action.
    ChainUnpooled,
    /// `std::sync::Mutex`.
    Mutex,
    /// Test-and-set spin lock.
    Spin,
    /// Dedicated worker thread draining a lock-free queue.
    Trustee,
}

impl StrategyKind {
    /// Every strategy, in the order reports list them.
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::Chain,
        StrategyKind::ChainLocal,
        StrategyKind::ChainUnpooled,
        StrategyKind::Mutex,
        StrategyKind::Spin,
        StrategyKind::Trustee,
    ];

    /// Flag spelling of every strategy.
    pub const NAMES: [&'static str; 6] = [
        "chain",
        "chain-local",
        "chain-unpooled",
        "mutex",
        "spin",
        "trustee",
    ];

    /// Flag spelling of this strategy.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Chain => "chain",
            StrategyKind::ChainLocal => "chain-local",
            StrategyKind::ChainUnpooled => "chain-unpooled",
            StrategyKind::Mutex => "mutex",
            StrategyKind::Spin => "spin",
            StrategyKind::Trustee => "trustee",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = FlagError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| FlagError::UnknownStrategy(name.to_owned()))
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Worker threads submitting concurrently.
    pub threads: usize,
    /// Total actions across all workers, rounded down to a multiple of `threads`.
    pub actions: u64,
    /// Strategy under test.
    pub strategy: StrategyKind,
    /// Pin worker `i` to core `i`.
    pub pin: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            actions: 16 << 20,
            strategy: StrategyKind::default(),
            pin: false,
        }
    }
}

impl BenchConfig {
    /// Read flags (program name already skipped) on top of the defaults.
    ///
    /// Accepts `--threads N`, `--actions N`, `--strategy NAME`, `--pin`, and
    /// the `--flag=value` spelling of each.
    pub fn from_args<I, S>(args: I) -> Result<Self, FlagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cfg = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_owned())),
                None => (arg, None),
            };
            let mut value = |name: &'static str| -> Result<String, FlagError> {
                match inline.clone() {
                    Some(v) => Ok(v),
                    None => args
                        .next()
                        .map(|v| v.as_ref().to_owned())
                        .ok_or(FlagError::MissingValue(name)),
                }
            };
            match flag {
                "--threads" => {
                    let threads = parse_count(&value("threads")?)?;
                    cfg.threads = usize::try_from(threads)
                        .map_err(|_| FlagError::Overflow(threads.to_string()))?;
                }
                "--actions" => cfg.actions = parse_count(&value("actions")?)?,
                "--strategy" => cfg.strategy = value("strategy")?.parse()?,
                "--pin" if inline.is_none() => cfg.pin = true,
                _ => return Err(FlagError::Unknown(arg.to_owned())),
            }
        }
        if cfg.threads == 0 {
            return Err(FlagError::NoThreads);
        }
        if cfg.total_actions() == 0 {
            return Err(FlagError::NoActions {
                actions: cfg.actions,
                threads: cfg.threads,
            });
        }
        Ok(cfg)
    }

    /// Actions each worker submits.
    pub fn actions_per_thread(&self) -> u64 {
        self.actions / self.threads as u64
    }

    /// Actions actually submitted: `actions` rounded down to a multiple of
    /// `threads`.
    pub fn total_actions(&self) -> u64 {
        self.actions_per_thread() * self.threads as u64
    }
}
