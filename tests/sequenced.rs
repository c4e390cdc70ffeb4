#![cfg(not(loom))]

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use action_chain::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn apply_wait_sees_every_earlier_apply() {
    let hist = Sequenced::new(HashMap::new());
    thread::scope(|s| {
        for t in 0..4u32 {
            let hist = &hist;
            s.spawn(move || {
                for _ in 0..2_500 {
                    hist.apply(move |m: &mut HashMap<u32, u32>| *m.entry(t).or_default() += 1);
                }
            });
        }
    });
    let snapshot = hist.apply_wait(|m| {
        let mut counts: Vec<_> = m.iter().map(|(k, v)| (*k, *v)).collect();
        counts.sort();
        counts
    });
    assert_eq!(snapshot, vec![(0, 2_500), (1, 2_500), (2, 2_500), (3, 2_500)]);
}

#[test]
fn apply_wait_accepts_large_closures() {
    let total = Sequenced::new(0u64);
    let big = [7u64; 64];
    let sum = total.apply_wait(move |t| {
        *t += big.iter().sum::<u64>();
        *t
    });
    assert_eq!(sum, 7 * 64);
}

#[test]
fn apply_wait_from_its_own_action_panics_instead_of_hanging() {
    let total: Arc<Sequenced<'static, u64>> = Arc::new(Sequenced::new(0));
    let inner = Arc::clone(&total);
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        total.apply(move |_| {
            inner.apply_wait(|t| *t);
        })
    }));
    assert!(result.is_err());

    // Still usable afterwards.
    total.apply(|t| *t += 1);
    assert_eq!(total.apply_wait(|t| *t), 1);
}

#[test]
fn apply_wait_from_another_chains_action_is_fine() {
    let total = Sequenced::new(0u64);
    let seen = AtomicU64::new(0);
    let chain = ActionChain::new();
    chain.run(|| {
        let now = total.apply_wait(|t| {
            *t += 5;
            *t
        });
        seen.store(now, Ordering::Relaxed);
    });
    drop(chain);
    assert_eq!(seen.into_inner(), 5);

    let other = Sequenced::new(10u64);
    let sum = other.apply_wait(|o| *o + total.apply_wait(|t| *t));
    assert_eq!(sum, 15);
}

#[test]
fn apply_wait_while_another_thread_runs_the_backlog() {
    const UPDATES: u64 = 20_000;

    let total = Sequenced::new(0u64);
    let done = AtomicBool::new(false);
    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..UPDATES {
                total.apply(|t| *t += 1);
            }
            done.store(true, Ordering::Release);
        });
        let mut last = 0;
        let mut waits = 0u64;
        while !done.load(Ordering::Acquire) || waits < 100 {
            let now = total.apply_wait(|t| *t);
            assert!(now >= last, "value went backwards: {now} < {last}");
            assert!(now <= UPDATES);
            last = now;
            waits += 1;
        }
    });
    assert_eq!(total.apply_wait(|t| *t), UPDATES);
}

#[test]
fn apply_wait_reports_a_panicking_closure() {
    let total = Sequenced::new(0u64);
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        total.apply_wait(|_| -> u64 { panic!("bad update") })
    }));
    assert!(result.is_err());
    total.apply(|t| *t += 2);
    assert_eq!(total.into_inner(), 2);
}

#[test]
fn explicit_handles_recycle_blocks() {
    let total = Sequenced::new(0u64);
    let mut mem = Mem::new();
    for _ in 0..100 {
        mem = total.apply_with(mem, |t| *t += 1);
        assert!(!mem.is_empty(), "idle submissions reclaim a block");
    }
    drop(mem);
    assert_eq!(total.into_inner(), 100);
}

#[test]
fn get_mut_and_default() {
    let mut names: Sequenced<'_, Vec<String>> = Sequenced::default();
    names.apply(|v| v.push("a".to_owned()));
    names.get_mut().push("b".to_owned());
    assert_eq!(names.into_inner(), ["a", "b"]);
}
