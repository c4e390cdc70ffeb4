use std::env;

use action_chain::harness::parse_count;
use action_chain::{Mem, Sequenced};

#[inline(never)]
fn touch(v: u64) {
    std::hint::black_box(v);
}

fn main() {
    let iterations: u64 = env::var("ITER")
        .ok()
        .and_then(|s| parse_count(&s).ok())
        .unwrap_or(50_000);

    let counter = Sequenced::new(0u64);
    let mut mem = Mem::new();

    // Warmup to stabilize cache state
    for _ in 0..(iterations / 10).max(1) {
        mem = counter.apply_with(mem, |c| *c += 1);
    }

    for _ in 0..iterations {
        mem = counter.apply_with(mem, |c| *c += 1);
    }

    drop(mem);
    let sum = counter.into_inner();
    touch(sum);
    println!("chain_sum={sum}");
}
