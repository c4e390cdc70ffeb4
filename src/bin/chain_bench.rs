//! Compare the action chain against lock-based strategies.
//!
//! ```text
//! chain_bench --threads 8 --actions 128M --strategy chain [--pin]
//! ```
//!
//! `RUST_LOG` controls diagnostics (default `info`); the report goes to stdout.

use action_chain::harness::{self, BenchConfig};
use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_names(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = BenchConfig::from_args(std::env::args().skip(1)).context("reading flags")?;
    let report = harness::measure(&cfg)?;
    tracing::info!(
        strategy = %report.strategy,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run complete"
    );
    println!("{report}");
    Ok(())
}
