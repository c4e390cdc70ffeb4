use std::sync::atomic::{AtomicU64, Ordering};

use action_chain::{ActionChain, Mem};

fn main() {
    let total = AtomicU64::new(0);
    let chain = ActionChain::new();

    // Thread the handle through: each synchronous submission hands back the
    // block its predecessor used, so the loop never touches the allocator.
    let mut mem = Mem::new();
    let mut reused = 0;
    for i in 0..1000u64 {
        let total = &total;
        if !mem.is_empty() {
            reused += 1;
        }
        mem = chain.run_with(mem, move || {
            total.fetch_add(i, Ordering::Relaxed);
        });
    }
    drop(mem);
    drop(chain);
    println!("sum={} reused={reused}", total.into_inner());
}
