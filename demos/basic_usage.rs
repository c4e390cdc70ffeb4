use std::sync::atomic::{AtomicBool, Ordering};

use action_chain::prelude::*;

fn main() {
    let ran = AtomicBool::new(false);
    let chain = ActionChain::new();

    // Idle chain: the action runs before `run` returns
    chain.run(|| ran.store(true, Ordering::Relaxed));
    println!("ran synchronously: {}", ran.load(Ordering::Relaxed));

    // Shared state without a lock
    let hits = Sequenced::new(Vec::new());
    std::thread::scope(|s| {
        for id in 0..4 {
            let hits = &hits;
            s.spawn(move || {
                for i in 0..3 {
                    hits.apply(move |log: &mut Vec<(usize, usize)>| log.push((id, i)));
                }
            });
        }
    });
    let log = hits.into_inner();
    println!("{} actions ran: {:?}", log.len(), log);
}
