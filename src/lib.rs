#![forbid(unsafe_op_in_unsafe_fn)]
#![deny(missing_docs)]

//! Wait-free ordered queue of actions: an alternative to locking for short,
//! hot critical sections. Submitters never block; whoever finds the chain
//! idle runs the backlog. Nodes are fixed-size blocks that can be recycled
//! through an explicit [`Mem`] handle or a per-thread cache.

mod chain;
mod node;
/// Node storage blocks and the reusable pool handle.
pub mod pool;
mod sequenced;
mod sync;

/// Benchmark harness comparing the chain with lock-based strategies.
pub mod harness;
/// Latch, wait budget, runner scope and thread pinning helpers.
pub mod util;

pub use chain::ActionChain;
pub use pool::local::clear_thread_cache;
pub use pool::{BLOCK_ALIGN, BLOCK_SIZE, MAX_ACTION_SIZE, Mem};
pub use sequenced::Sequenced;
pub use util::is_running_actions;

/// Commonly used items.
pub mod prelude {
    pub use crate::{ActionChain, Mem, Sequenced};
}
