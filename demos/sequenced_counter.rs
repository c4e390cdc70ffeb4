use std::thread;

use action_chain::Sequenced;

fn main() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 100_000;

    let counter = Sequenced::new(0u64);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    counter.apply(|c| *c += 1);
                }
            });
        }
    });

    // Blocks until every earlier increment has run
    let seen = counter.apply_wait(|c| *c);
    assert_eq!(seen, THREADS * PER_THREAD);
    println!("counter={seen}");
}
