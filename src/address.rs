//! Physical address type
//!
//! Safe wrapper around raw physical addresses, with page alignment helpers.

use core::fmt;
use core::ops::{Add, Sub};

/// Page size (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Represents a physical address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysicalAddress(usize);

impl PhysicalAddress {
    /// Create a new physical address
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Return the raw address value
    pub const fn value(self) -> usize {
        self.0
    }

    /// Check whether the address is page aligned
    pub const fn is_page_aligned(self) -> bool {
        self.0 % PAGE_SIZE == 0
    }

    /// Round the address down to the start of its page
    pub const fn align_down_to_page(self) -> Self {
        Self(self.0 & !(PAGE_SIZE - 1))
    }

    /// Round the address up to the start of the next page
    pub const fn align_up_to_page(self) -> Self {
        Self((self.0 + PAGE_SIZE - 1) & !(PAGE_SIZE - 1))
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

impl Add<usize> for PhysicalAddress {
    type Output = Self;
    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<usize> for PhysicalAddress {
    type Output = Self;
    fn sub(self, rhs: usize) -> Self::Output {
        Self(self.0 - rhs)
    }
}
