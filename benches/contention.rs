use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use action_chain::prelude::*;

fn spawn_hammer<S, F>(shared: Arc<S>, run: Arc<AtomicBool>, workers: usize, op: F) -> Vec<JoinHandle<()>>
where
    S: Send + Sync + 'static,
    F: Fn(&S) + Copy + Send + 'static,
{
    (0..workers)
        .map(|_| {
            let shared = Arc::clone(&shared);
            let run = Arc::clone(&run);
            thread::spawn(move || {
                while run.load(Ordering::Relaxed) {
                    op(&shared);
                }
            })
        })
        .collect()
}

fn stop(run: &AtomicBool, threads: Vec<JoinHandle<()>>) {
    run.store(false, Ordering::Relaxed);
    for t in threads {
        let _ = t.join();
    }
}

fn bench_contention(c: &mut Criterion) {
    let workers = 3;

    let mut group = c.benchmark_group("high_contention");
    group.measurement_time(Duration::from_secs(10));
    group.warm_up_time(Duration::from_millis(1200));
    group.throughput(Throughput::Elements(1));

    // AtomicU64 fetch_add: the floor for a shared counter
    {
        let ctr = Arc::new(AtomicU64::new(0));
        let run = Arc::new(AtomicBool::new(true));
        let threads = spawn_hammer(Arc::clone(&ctr), Arc::clone(&run), workers, |c: &AtomicU64| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        group.bench_function(BenchmarkId::new("atomic_seqcst", workers), |b| {
            b.iter(|| ctr.fetch_add(1, Ordering::SeqCst));
        });
        stop(&run, threads);
    }

    // Mutex<u64>
    {
        let ctr = Arc::new(Mutex::new(0u64));
        let run = Arc::new(AtomicBool::new(true));
        let threads = spawn_hammer(Arc::clone(&ctr), Arc::clone(&run), workers, |c: &Mutex<u64>| {
            if let Ok(mut g) = c.lock() {
                *g += 1;
            }
        });
        group.bench_function(BenchmarkId::new("mutex", workers), |b| {
            b.iter(|| {
                let mut g = ctr.lock().unwrap();
                *g += 1;
            });
        });
        stop(&run, threads);
    }

    // Sequenced<u64>, per-thread pool
    {
        let ctr = Arc::new(Sequenced::new(0u64));
        let run = Arc::new(AtomicBool::new(true));
        let threads = spawn_hammer(Arc::clone(&ctr), Arc::clone(&run), workers, |c: &Sequenced<'static, u64>| {
            c.apply(|v| *v += 1);
        });
        group.bench_function(BenchmarkId::new("chain_thread_pool", workers), |b| {
            b.iter(|| ctr.apply(|v| *v += 1));
        });
        stop(&run, threads);
    }

    // Sequenced<u64>, explicit handle on the measured thread
    {
        let ctr = Arc::new(Sequenced::new(0u64));
        let run = Arc::new(AtomicBool::new(true));
        let threads = spawn_hammer(Arc::clone(&ctr), Arc::clone(&run), workers, |c: &Sequenced<'static, u64>| {
            c.apply(|v| *v += 1);
        });
        group.bench_function(BenchmarkId::new("chain_explicit_mem", workers), |b| {
            let mut mem = Mem::new();
            b.iter(|| {
                mem = ctr.apply_with(std::mem::take(&mut mem), |v| *v += 1);
            });
        });
        stop(&run, threads);
    }

    group.finish();
}

criterion_group!(benches, bench_contention);
criterion_main!(benches);
