#![cfg(not(loom))]

use std::time::Duration;

use action_chain::harness::{self, BenchConfig, FlagError, Report, StrategyKind, parse_count};
use pretty_assertions::assert_eq;

#[test]
fn counts_take_binary_suffixes() {
    assert_eq!(parse_count("1000"), Ok(1000));
    assert_eq!(parse_count("64k"), Ok(64 << 10));
    assert_eq!(parse_count("128M"), Ok(128 << 20));
    assert_eq!(parse_count("2g"), Ok(2 << 30));
    assert_eq!(parse_count("0"), Ok(0));
}

#[test]
fn malformed_counts_are_rejected() {
    for bad in ["", "K", "12x", "-3", "1.5M", " 7"] {
        assert_eq!(
            parse_count(bad),
            Err(FlagError::InvalidCount(bad.to_owned())),
            "{bad:?}"
        );
    }
    assert_eq!(
        parse_count("99999999999999999999"),
        Err(FlagError::Overflow("99999999999999999999".to_owned()))
    );
    assert_eq!(
        parse_count("17179869184G"),
        Err(FlagError::Overflow("17179869184G".to_owned()))
    );
}

#[test]
fn strategy_names_round_trip() {
    for (kind, name) in StrategyKind::ALL.into_iter().zip(StrategyKind::NAMES) {
        assert_eq!(kind.to_string(), name);
        assert_eq!(name.parse::<StrategyKind>(), Ok(kind));
    }
    assert_eq!("MUTEX".parse::<StrategyKind>(), Ok(StrategyKind::Mutex));
    let err = "rwlock".parse::<StrategyKind>().unwrap_err();
    assert_eq!(err, FlagError::UnknownStrategy("rwlock".to_owned()));
    assert!(err.to_string().contains("chain-unpooled"));
}

#[test]
fn flags_in_both_spellings() {
    let cfg = BenchConfig::from_args(["--threads", "3", "--actions=1M", "--strategy", "spin", "--pin"])
        .unwrap();
    assert_eq!(
        cfg,
        BenchConfig {
            threads: 3,
            actions: 1 << 20,
            strategy: StrategyKind::Spin,
            pin: true,
        }
    );
    assert_eq!(cfg.actions_per_thread(), (1 << 20) / 3);
    assert_eq!(cfg.total_actions(), (1 << 20) / 3 * 3);
}

#[test]
fn no_flags_means_defaults() {
    let cfg = BenchConfig::from_args(Vec::<String>::new()).unwrap();
    assert_eq!(cfg, BenchConfig::default());
    assert_eq!(cfg.strategy, StrategyKind::Chain);
    assert_eq!(cfg.actions, 16 << 20);
    assert!(cfg.threads >= 1);
}

#[test]
fn bad_flags() {
    assert_eq!(
        BenchConfig::from_args(["--verbose"]),
        Err(FlagError::Unknown("--verbose".to_owned()))
    );
    assert_eq!(
        BenchConfig::from_args(["--actions"]),
        Err(FlagError::MissingValue("actions"))
    );
    assert_eq!(
        BenchConfig::from_args(["--threads=0"]),
        Err(FlagError::NoThreads)
    );
    assert_eq!(
        BenchConfig::from_args(["--actions", "0"]),
        Err(FlagError::NoActions {
            actions: 0,
            threads: BenchConfig::default().threads,
        })
    );
    assert_eq!(
        BenchConfig::from_args(["--threads=8", "--actions=7"]),
        Err(FlagError::NoActions {
            actions: 7,
            threads: 8,
        })
    );
    assert_eq!(
        BenchConfig::from_args(["--pin=yes"]),
        Err(FlagError::Unknown("--pin=yes".to_owned()))
    );
    assert_eq!(
        BenchConfig::from_args(["--strategy", "queue"]),
        Err(FlagError::UnknownStrategy("queue".to_owned()))
    );
}

#[test]
fn every_strategy_keeps_an_exact_tally() {
    for strategy in StrategyKind::ALL {
        let cfg = BenchConfig {
            threads: 4,
            actions: 40_000,
            strategy,
            pin: false,
        };
        let report = harness::measure(&cfg).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(report.strategy, strategy);
        assert_eq!(report.threads, 4);
        assert_eq!(report.actions, 40_000);
    }
}

#[test]
fn uneven_split_rounds_down() {
    let cfg = BenchConfig {
        threads: 3,
        actions: 10,
        strategy: StrategyKind::Chain,
        pin: false,
    };
    assert_eq!(harness::measure(&cfg).unwrap().actions, 9);
}

#[test]
fn pinned_run_still_counts() {
    let cfg = BenchConfig {
        threads: 2,
        actions: 2_000,
        strategy: StrategyKind::ChainLocal,
        pin: true,
    };
    assert_eq!(harness::measure(&cfg).unwrap().actions, 2_000);
}

#[test]
fn report_format() {
    let report = Report {
        strategy: StrategyKind::Mutex,
        threads: 4,
        actions: 4_000,
        elapsed: Duration::from_millis(2),
    };
    assert!((report.actions_per_second() - 2_000_000.0).abs() < 1e-3);
    assert!((report.nanos_per_action() - 500.0).abs() < 1e-6);
    assert_eq!(
        report.to_string(),
        "Strategy: mutex\n\
         Actions: 4000\n\
         Threads: 4\n\
         Actions per thread: 1000\n\
         Total wall time (s): 0.002000\n\
         Actions per second: 2000000\n\
         Time per action (ns): 500.00"
    );
}
