//! Node layout and the submission/execution state machine.
//!
//! A node is a [`Header`] followed inline by its action, all inside one
//! [`Block`]. The header's successor field moves exactly once from
//! [`Link::Unset`] to either [`Link::Linked`] (a successor arrived first) or
//! [`Link::Sealed`] (the action finished first). Whichever thread loses that
//! race knows who runs what next:
//! - the submitter that finds `Sealed` runs the backlog itself;
//! - the runner that finds `Linked` retires the node and moves on.

use core::any::Any;
use core::mem::{ManuallyDrop, align_of, size_of};
use core::ptr::{self, NonNull};
use std::panic::{self, AssertUnwindSafe};

use crate::pool::{BLOCK_ALIGN, BLOCK_SIZE, Block};
use crate::sync::atomic::{AtomicPtr, Ordering};
use crate::util::scope::RunnerScope;

/// Bytes taken by the header in front of every inline action.
pub(crate) const HEADER_SIZE: usize = size_of::<Header>();

// Never a valid header address: headers sit at BLOCK_ALIGN boundaries.
const SEALED_ADDR: usize = 1;
const _: () = assert!(BLOCK_ALIGN > SEALED_ADDR);

/// Logical state of a node's successor field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    /// No successor yet and the action has not finished.
    Unset,
    /// A successor was attached before the action finished.
    Linked(NonNull<Header>),
    /// The action finished with no successor attached.
    Sealed,
}

impl Link {
    #[inline]
    fn into_ptr(self) -> *mut Header {
        match self {
            Link::Unset => ptr::null_mut(),
            Link::Linked(next) => next.as_ptr(),
            Link::Sealed => ptr::without_provenance_mut(SEALED_ADDR),
        }
    }

    #[inline]
    fn from_ptr(raw: *mut Header) -> Self {
        match NonNull::new(raw) {
            None => Link::Unset,
            Some(_) if raw.addr() == SEALED_ADDR => Link::Sealed,
            Some(next) => Link::Linked(next),
        }
    }
}

/// Atomic storage for a [`Link`].
pub(crate) struct AtomicLink(AtomicPtr<Header>);

impl AtomicLink {
    #[inline]
    fn unset() -> Self {
        Self(AtomicPtr::new(ptr::null_mut()))
    }

    /// Exchange the state; acquire pairs with the release half of the
    /// other side of the race.
    #[inline]
    pub(crate) fn swap(&self, link: Link) -> Link {
        Link::from_ptr(self.0.swap(link.into_ptr(), Ordering::AcqRel))
    }

    #[inline]
    pub(crate) fn load(&self) -> Link {
        Link::from_ptr(self.0.load(Ordering::Acquire))
    }
}

/// Type-erased front of every node.
#[repr(C)]
pub(crate) struct Header {
    next: AtomicLink,
    invoke: unsafe fn(NonNull<Header>),
}

#[repr(C)]
struct Node<F> {
    header: Header,
    action: ManuallyDrop<F>,
}

impl<F: FnOnce()> Node<F> {
    const FITS: () = assert!(
        size_of::<Node<F>>() <= BLOCK_SIZE && align_of::<Node<F>>() <= BLOCK_ALIGN,
        "action captures too much state to fit inline in a node block"
    );

    /// Build a node for `action` inside `block`.
    #[inline]
    fn create(block: Block, action: F) -> NonNull<Header> {
        #[allow(clippy::let_unit_value)]
        let () = Self::FITS;
        let node = block.into_raw().cast::<Node<F>>();
        // Safety: the block is ours, large and aligned enough (FITS).
        unsafe {
            node.write(Node {
                header: Header {
                    next: AtomicLink::unset(),
                    invoke: Self::invoke,
                },
                action: ManuallyDrop::new(action),
            });
        }
        node.cast()
    }

    /// Move the action out and call it.
    ///
    /// # Safety
    /// `header` heads a live `Node<F>` whose action has not been taken.
    unsafe fn invoke(header: NonNull<Header>) {
        let node = header.cast::<Node<F>>().as_ptr();
        // Safety: per contract; only the runner touches the action field.
        let action = unsafe { ManuallyDrop::into_inner(ptr::read(&raw const (*node).action)) };
        action();
    }
}

#[cfg(debug_assertions)]
unsafe fn already_invoked(_: NonNull<Header>) {
    panic!("node action invoked twice");
}

impl Header {
    /// Build a node for `action` inside `block`, rejecting oversized actions at
    /// compile time.
    #[inline]
    pub(crate) fn create<F: FnOnce()>(block: Block, action: F) -> NonNull<Header> {
        Node::create(block, action)
    }

    /// The successor field of `header`.
    ///
    /// # Safety
    /// `header` must point at a node that has not been retired.
    #[inline]
    pub(crate) unsafe fn next<'n>(header: NonNull<Header>) -> &'n AtomicLink {
        unsafe { &(*header.as_ptr()).next }
    }

    /// Run the node's action.
    ///
    /// # Safety
    /// Only the thread currently responsible for `header` may call this, once.
    #[inline]
    unsafe fn invoke(header: NonNull<Header>) {
        let raw = header.as_ptr();
        // Safety: the invoke pointer is only written by the responsible thread.
        let invoke = unsafe { ptr::read(&raw const (*raw).invoke) };
        #[cfg(debug_assertions)]
        unsafe {
            ptr::write(&raw mut (*raw).invoke, already_invoked);
        }
        unsafe { invoke(header) }
    }

    /// Give back the storage of a node whose action already ran.
    ///
    /// # Safety
    /// The action must have been invoked and no other thread may still
    /// reach `header`.
    #[inline]
    pub(crate) unsafe fn retire(header: NonNull<Header>) -> Block {
        // The header holds no owned resources and the action was moved out.
        unsafe { Block::from_raw(header.cast()) }
    }
}

/// Link `node` behind `prev`, the tail it displaced.
///
/// Returns `None` when `prev` is still pending or running: its runner will
/// pick `node` up. Otherwise `prev` was sealed, so the caller now owns the
/// backlog starting at `node` and runs it before returning the last block it
/// freed.
///
/// `owner` identifies the chain for [`RunnerScope`].
///
/// # Safety
/// `prev` must be the value the tail held before it was exchanged for `node`,
/// and `node` must be freshly created.
pub(crate) unsafe fn hand_off(
    prev: NonNull<Header>,
    node: NonNull<Header>,
    owner: usize,
) -> Option<Block> {
    match unsafe { Header::next(prev) }.swap(Link::Linked(node)) {
        Link::Unset => None,
        Link::Sealed => {
            // Safety: prev's runner has stopped and the tail moved past it.
            let mut spare = Some(unsafe { Header::retire(prev) });
            unsafe { run_backlog(node, &mut spare, owner) };
            spare
        }
        Link::Linked(_) => unreachable!("node linked to two successors"),
    }
}

/// Run `node` and every successor that arrives while running, in order.
///
/// Each retired node's block replaces `spare`; the previous spare is freed.
/// Stops at the first node that seals without a successor. A panicking
/// action is logged, the rest of the backlog still runs, and the first panic
/// is resumed afterwards.
///
/// # Safety
/// The caller must be the thread responsible for running `node`.
pub(crate) unsafe fn run_backlog(
    mut node: NonNull<Header>,
    spare: &mut Option<Block>,
    owner: usize,
) {
    let _scope = RunnerScope::enter(owner);
    let mut panicked: Option<Box<dyn Any + Send>> = None;
    loop {
        // Safety: we are responsible for `node` and it has not run.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| unsafe { Header::invoke(node) }));
        if let Err(payload) = outcome {
            tracing::error!("action panicked; draining the remaining backlog first");
            panicked.get_or_insert(payload);
        }
        match unsafe { Header::next(node) }.swap(Link::Sealed) {
            Link::Linked(next) => {
                // Safety: next's submitter is done with `node`.
                *spare = Some(unsafe { Header::retire(node) });
                node = next;
            }
            Link::Unset => break,
            Link::Sealed => unreachable!("node sealed twice"),
        }
    }
    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
}
