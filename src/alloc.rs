//! The allocator collaborator.
//!
//! Every container is constructed with an [`Allocator`]; a four-slot
//! C-style contract (`alloc`, `free`, `aligned_alloc`, `aligned_free`)
//! collapses into two methods here because [`Layout`] already carries both
//! size and alignment — a page-aligned [`Layout`] is simply passed for
//! BTree/RankTree nodes instead of routing through a separate "aligned"
//! entry point.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;

/// A memory allocation capability.
///
/// Implementations must behave like the standard global allocator: a
/// `Layout` passed to `dealloc` must be the same one passed to the
/// `alloc` call that produced the pointer.
///
/// # Safety
///
/// Implementors must return either a null-free, correctly aligned pointer
/// valid for `layout.size()` bytes, or `None`. `dealloc` must accept
/// exactly the pointers this allocator produced.
pub unsafe trait Allocator {
    /// Allocates memory fitting `layout`, or returns `None` on failure.
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Deallocates memory previously returned by `alloc` with the same
    /// layout.
    ///
    /// # Safety
    /// `ptr` must have been returned by a prior call to `self.alloc(layout)`
    /// and not already freed.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The default allocator, forwarding to the process's global allocator.
///
/// Used whenever a container is constructed without an explicit
/// allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

// SAFETY: forwards directly to `std::alloc`, which upholds the contract.
unsafe impl Allocator for System {
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return NonNull::new(layout.align() as *mut u8);
        }
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr)
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // SAFETY: caller guarantees `ptr`/`layout` match a prior `alloc`.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

/// A shared handle to an [`Allocator`], cheaply cloneable and stored by
/// every container so that internal node types don't need to carry a
/// generic allocator parameter (BTree and RankTree in particular allocate
/// uniform page-sized blocks regardless of the payload type `T`).
#[derive(Clone)]
pub struct AllocatorHandle(Arc<dyn Allocator + Send + Sync>);

impl AllocatorHandle {
    /// Wraps an allocator for storage in a container.
    pub fn new<A: Allocator + Send + Sync + 'static>(allocator: A) -> Self {
        Self(Arc::new(allocator))
    }

    /// The system default allocator handle.
    #[must_use]
    pub fn system() -> Self {
        Self::new(System)
    }

    /// Allocates memory fitting `layout`, or returns `None` on failure.
    #[must_use]
    pub fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.0.alloc(layout)
    }

    /// Deallocates memory previously returned by `alloc` with the same
    /// layout.
    ///
    /// # Safety
    /// Same contract as [`Allocator::dealloc`].
    pub unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.0.dealloc(ptr, layout) };
    }
}

impl Default for AllocatorHandle {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_round_trips() {
        let a = System;
        let layout = Layout::new::<u64>();
        let ptr = a.alloc(layout).expect("allocation should succeed");
        unsafe {
            ptr.as_ptr().cast::<u64>().write(0xDEAD_BEEF);
            assert_eq!(ptr.as_ptr().cast::<u64>().read(), 0xDEAD_BEEF);
            a.dealloc(ptr, layout);
        }
    }

    #[test]
    fn handle_defaults_to_system() {
        let handle = AllocatorHandle::default();
        let layout = Layout::new::<[u8; 64]>();
        let ptr = handle.alloc(layout).unwrap();
        unsafe { handle.dealloc(ptr, layout) };
    }
}
