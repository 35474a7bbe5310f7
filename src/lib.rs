//! Shared physical page table for file-backed mappings
//!
//! When several processes map the same window of the same file with
//! `MAP_SHARED`, their page tables must end up pointing at the *same*
//! physical frame. This crate provides the kernel-side table that
//! deduplicates those frames: entries are keyed by (device, inode,
//! page-aligned offset), reference counted per mapping relationship, and the
//! backing frame goes back to the allocator exactly when the last mapper
//! releases it.
//!
//! The table never evicts on its own: capacity exhaustion is an immediate
//! error and the retry policy belongs to the mapping layer.

#![cfg_attr(not(test), no_std)]

pub mod address;
pub mod frame;
pub mod frame_allocator;
pub mod table;

// Re-exports
pub use address::{PhysicalAddress, PAGE_SIZE};
pub use frame::{Frame, FRAME_SIZE};
pub use frame_allocator::FrameAllocator;
pub use table::{
    get_shared_page, init, is_shared_page_initialized, mark_shared_page_initialized,
    release_shared_page, PageKey, SharedPageTable, SHARED_PAGE_SLOTS,
};

// Error type for shared page operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedPageError {
    /// No slot or no physical frame left. The two causes are deliberately
    /// collapsed; the caller's answer is the same either way (fail the
    /// mapping or reclaim something and retry).
    NoPageAvailable,
}

impl core::fmt::Display for SharedPageError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            SharedPageError::NoPageAvailable => write!(f, "no shared page available"),
        }
    }
}

pub type SharedPageResult<T> = Result<T, SharedPageError>;
