//! Fixed-size node storage and the reusable pool handle.
//! - One size class: every node block has the same size and alignment.
//! - A block freed by a synchronous submission is handed back to the caller
//!   as a [`Mem`] so the next submission can skip the allocator.

use core::fmt;
use core::ptr::{self, NonNull};
use std::alloc::{self, Layout};

/// Per-thread pool context backing [`ActionChain::run`](crate::ActionChain::run).
pub mod local;

/// Size in bytes of one node block (header plus inline action).
#[cfg(not(loom))]
pub const BLOCK_SIZE: usize = 64;
/// Size in bytes of one node block (header plus inline action).
///
/// Larger under loom, whose atomics carry model-checking state.
#[cfg(loom)]
pub const BLOCK_SIZE: usize = 256;

/// Alignment of every node block; an action may not require more.
pub const BLOCK_ALIGN: usize = 16;

/// Largest action (captured state) that fits inline next to the node header.
pub const MAX_ACTION_SIZE: usize = BLOCK_SIZE - crate::node::HEADER_SIZE;

const BLOCK_LAYOUT: Layout = match Layout::from_size_align(BLOCK_SIZE, BLOCK_ALIGN) {
    Ok(layout) => layout,
    Err(_) => panic!("invalid node block layout"),
};

/// Owner of one raw node block. Dropping it returns the memory to the allocator.
pub(crate) struct Block {
    ptr: NonNull<u8>,
}

// Safety: a block is plain memory owned by exactly one value at a time.
unsafe impl Send for Block {}

impl Block {
    /// Allocate a fresh block.
    #[inline]
    pub(crate) fn alloc() -> Self {
        // Safety: BLOCK_LAYOUT has non-zero size.
        let raw = unsafe { alloc::alloc(BLOCK_LAYOUT) };
        match NonNull::new(raw) {
            Some(ptr) => Self { ptr },
            None => alloc::handle_alloc_error(BLOCK_LAYOUT),
        }
    }

    /// Give up ownership; the caller becomes responsible for the memory.
    #[inline]
    pub(crate) fn into_raw(self) -> NonNull<u8> {
        let ptr = self.ptr;
        core::mem::forget(self);
        ptr
    }

    /// Reclaim ownership of memory previously released by [`Block::into_raw`].
    ///
    /// # Safety
    /// `ptr` must come from `into_raw`, must not be owned by anything else, and
    /// whatever was written into it must not need dropping.
    #[inline]
    pub(crate) unsafe fn from_raw(ptr: NonNull<u8>) -> Self {
        Self { ptr }
    }

    #[inline]
    fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for Block {
    #[inline]
    fn drop(&mut self) {
        // Safety: allocated with BLOCK_LAYOUT and exclusively owned.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), BLOCK_LAYOUT) }
    }
}

/// Reusable storage handle threaded from one submission to the next.
///
/// Holds at most one node block. It is move-only: passing it to
/// [`ActionChain::run_with`](crate::ActionChain::run_with) gives the block
/// away, and the call hands back whichever block it reclaimed (if any).
/// Dropping a non-empty handle frees its block.
#[derive(Default)]
pub struct Mem {
    block: Option<Block>,
}

impl Mem {
    /// An empty handle; the next submission using it allocates.
    #[inline]
    pub const fn new() -> Self {
        Self { block: None }
    }

    /// Does this handle currently hold no block?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block.is_none()
    }

    /// Address of the held block, or null when empty. For diagnostics only.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.block.as_ref().map_or(ptr::null(), Block::as_ptr)
    }

    #[inline]
    pub(crate) fn from_block(block: Option<Block>) -> Self {
        Self { block }
    }

    /// Reuse the held block or allocate a new one.
    #[inline]
    pub(crate) fn into_block(self) -> Block {
        self.block.unwrap_or_else(Block::alloc)
    }
}

impl fmt::Debug for Mem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Mem").field(&self.as_ptr()).finish()
    }
}
