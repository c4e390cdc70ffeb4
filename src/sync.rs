//! Atomics used by the submission protocol.
//!
//! Resolves to `loom` under `cfg(loom)` so the protocol can be model-checked.

#[cfg(loom)]
use loom::sync;

#[cfg(not(loom))]
use std::sync;

pub mod atomic {
    pub use super::sync::atomic::{AtomicPtr, Ordering};
}
