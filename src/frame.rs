//! Physical frame structure and operations

use crate::address::{PhysicalAddress, PAGE_SIZE};

/// Frame size (4KB)
pub const FRAME_SIZE: usize = PAGE_SIZE;

/// Physical memory frame
///
/// This is the handle the shared page table hands out: it names one page of
/// physical memory, nothing more. The table keeps the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frame {
    /// Starting physical address
    pub start: PhysicalAddress,
}

impl Frame {
    /// Create frame from physical address
    pub const fn new(addr: PhysicalAddress) -> Self {
        Self { start: addr }
    }

    /// Get frame containing given address
    pub const fn containing_address(addr: PhysicalAddress) -> Self {
        Self {
            start: PhysicalAddress::new(addr.value() & !(FRAME_SIZE - 1)),
        }
    }

    /// Get starting address
    pub const fn address(&self) -> PhysicalAddress {
        self.start
    }

    /// Get frame number
    pub const fn number(&self) -> usize {
        self.start.value() / FRAME_SIZE
    }
}
