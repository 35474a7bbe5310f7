//! Physical frame allocator interface
//!
//! The shared page table sources its frames from an external allocator.
//! Implementations manage their own interior locking, never block, and must
//! not call back into the shared page table (the table invokes the allocator
//! while holding its own locks).

use crate::frame::Frame;

/// Single-frame allocation primitive
pub trait FrameAllocator {
    /// Hand out one free frame, or `None` when physical memory is exhausted
    fn allocate_frame(&self) -> Option<Frame>;

    /// Return a frame previously obtained from `allocate_frame`
    fn deallocate_frame(&self, frame: Frame);
}

// A reference to an allocator is itself an allocator, so a `&'static`
// allocator can be injected into the table.
impl<A: FrameAllocator + ?Sized> FrameAllocator for &A {
    fn allocate_frame(&self) -> Option<Frame> {
        (**self).allocate_frame()
    }

    fn deallocate_frame(&self, frame: Frame) {
        (**self).deallocate_frame(frame)
    }
}
