use std::sync::Mutex;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};

use action_chain::prelude::*;

fn bench_fast_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");
    group.measurement_time(Duration::from_secs(5));

    // Baseline: an uncontended mutex
    group.bench_function("mutex", |b| {
        let ctr = Mutex::new(0u64);
        b.iter(|| {
            *ctr.lock().unwrap() += 1;
        });
    });

    // Idle chain: every submission takes the synchronous path
    group.bench_function("chain_explicit_mem", |b| {
        let ctr = Sequenced::new(0u64);
        let mut mem = Mem::new();
        b.iter(|| {
            mem = ctr.apply_with(std::mem::take(&mut mem), |v| *v += 1);
        });
    });

    group.bench_function("chain_thread_pool", |b| {
        let ctr = Sequenced::new(0u64);
        b.iter(|| ctr.apply(|v| *v += 1));
    });

    // Fresh allocation per action
    group.bench_function("chain_unpooled", |b| {
        let ctr = Sequenced::new(0u64);
        b.iter(|| drop(ctr.apply_with(Mem::new(), |v| *v += 1)));
    });

    group.finish();
}

criterion_group!(benches, bench_fast_path);
criterion_main!(benches);
