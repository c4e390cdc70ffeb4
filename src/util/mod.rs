/// Thread pinning for benchmark workers.
pub mod affinity;
/// One-shot blocking gate carrying an optional value.
pub mod latch;
/// Runner-scope tracking.
pub mod scope;
/// Wait budget utilities for spin-wait loops.
pub mod wait;

pub use affinity::{PinConfig, pin_current_thread};
pub use latch::Latch;
pub use scope::is_running_actions;
pub use wait::WaitBudget;
