//! Reference-counted table of shared file-backed pages
//!
//! One entry per (device, inode, offset) window currently mapped somewhere.
//! Locking is two-tier: the table mutex decides which entries exist (lookup
//! and slot claiming), and each slot's own mutex protects that entry's
//! mutable fields. The table lock is always taken first, at most one entry
//! lock is held at a time, and an entry lock never outlives the table lock.
//! This ordering is what keeps the table deadlock-free.

use spin::{Mutex, Once};

use crate::address::PAGE_SIZE;
use crate::frame::Frame;
use crate::frame_allocator::FrameAllocator;
use crate::{SharedPageError, SharedPageResult};

/// Maximum number of simultaneously shared pages
pub const SHARED_PAGE_SLOTS: usize = 64;

/// Identity of one page-sized window of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    /// Storage device the file lives on
    pub device: u32,
    /// Inode number of the file
    pub inode: u32,
    /// Byte offset of the window in the file, page aligned
    pub offset: usize,
}

impl PageKey {
    pub const fn new(device: u32, inode: u32, offset: usize) -> Self {
        Self {
            device,
            inode,
            offset,
        }
    }
}

/// One slot of the table
struct Entry {
    key: PageKey,
    /// Backing frame; `None` marks the slot free
    frame: Option<Frame>,
    /// Number of mapping relationships currently pointing at `frame`
    refcount: usize,
    /// Whether the page contents were populated from backing storage
    initialized: bool,
}

impl Entry {
    const fn vacant() -> Self {
        Self {
            key: PageKey::new(0, 0, 0),
            frame: None,
            refcount: 0,
            initialized: false,
        }
    }

    fn is_live(&self) -> bool {
        self.frame.is_some()
    }
}

/// Table of currently shared pages
///
/// Usable as a plain value (tests build several independent instances) or
/// through the process-wide singleton installed by [`init`].
pub struct SharedPageTable<A: FrameAllocator> {
    /// Table lock around the slot array; the per-slot mutexes nest inside
    slots: Mutex<[Mutex<Entry>; SHARED_PAGE_SLOTS]>,
    allocator: A,
}

impl<A: FrameAllocator> SharedPageTable<A> {
    /// Create an empty table drawing frames from `allocator`
    pub fn new(allocator: A) -> Self {
        Self {
            slots: Mutex::new(core::array::from_fn(|_| Mutex::new(Entry::vacant()))),
            allocator,
        }
    }

    /// Look up or create the shared page for `key`.
    ///
    /// Every successful call adds one reference that the caller must pay
    /// back with exactly one [`release`](Self::release). The whole operation
    /// runs under the table lock, so two concurrent misses on the same key
    /// serialize: the second one sees the entry the first created and shares
    /// it instead of allocating again.
    ///
    /// Fails when all slots hold distinct live identities or the allocator
    /// has no frame left; a failed call leaves the table untouched.
    pub fn get(&self, key: PageKey) -> SharedPageResult<Frame> {
        debug_assert!(key.offset % PAGE_SIZE == 0);

        let slots = self.slots.lock();

        // Existing entry: one more mapper for the same window.
        for slot in slots.iter() {
            let mut entry = slot.lock();
            if let Some(frame) = entry.frame {
                if entry.key == key {
                    entry.refcount += 1;
                    return Ok(frame);
                }
            }
        }

        // New window: claim a free slot while still holding the table lock.
        let Some(slot) = slots.iter().find(|slot| !slot.lock().is_live()) else {
            log::warn!("shared page table full ({} slots)", SHARED_PAGE_SLOTS);
            return Err(SharedPageError::NoPageAvailable);
        };

        let Some(frame) = self.allocator.allocate_frame() else {
            log::warn!("no physical frame for shared page {:?}", key);
            return Err(SharedPageError::NoPageAvailable);
        };

        let mut entry = slot.lock();
        entry.key = key;
        entry.frame = Some(frame);
        entry.refcount = 1;
        entry.initialized = false;
        Ok(frame)
    }

    /// Record that the page contents were copied in from backing storage.
    ///
    /// Idempotent. A stale handle (entry freed by a racing release) is
    /// silently ignored.
    pub fn mark_initialized(&self, frame: Frame) {
        let slots = self.slots.lock();
        if let Some(slot) = find_by_frame(&*slots, frame) {
            slot.lock().initialized = true;
        }
    }

    /// Whether the page contents were already populated.
    ///
    /// Also `false` when the handle no longer names a live entry. The first
    /// mapper observing `false` does the population; it must hold its own
    /// reference across the whole check-and-populate sequence, the table
    /// does not arbitrate that race.
    pub fn is_initialized(&self, frame: Frame) -> bool {
        let slots = self.slots.lock();
        match find_by_frame(&*slots, frame) {
            Some(slot) => slot.lock().initialized,
            None => false,
        }
    }

    /// Drop one reference to a shared page.
    ///
    /// When the last reference goes away, the frame is handed back to the
    /// allocator and the slot reset, inside the same critical section. An
    /// unknown handle is ignored: the entry may already have been freed by a
    /// concurrent release between unmap and this call. Releasing a live
    /// entry more often than it was obtained is a caller bug and ends in a
    /// frame double-free.
    pub fn release(&self, frame: Frame) {
        let slots = self.slots.lock();
        let Some(slot) = find_by_frame(&*slots, frame) else {
            log::debug!("release of unknown shared page {:?}", frame);
            return;
        };

        let mut entry = slot.lock();
        entry.refcount -= 1;
        if entry.refcount == 0 {
            self.allocator.deallocate_frame(frame);
            *entry = Entry::vacant();
        }
    }

    /// Current reference count of the entry backing `frame`, if live
    pub fn reference_count(&self, frame: Frame) -> Option<usize> {
        let slots = self.slots.lock();
        find_by_frame(&*slots, frame).map(|slot| slot.lock().refcount)
    }

    /// Number of live entries
    pub fn live_pages(&self) -> usize {
        let slots = self.slots.lock();
        slots.iter().filter(|slot| slot.lock().is_live()).count()
    }
}

// Reverse lookup by handle; release and the initialized accessors are called
// from unmap paths that only know the frame, not the identity. Caller holds
// the table lock.
fn find_by_frame(slots: &[Mutex<Entry>], frame: Frame) -> Option<&Mutex<Entry>> {
    slots.iter().find(|slot| slot.lock().frame == Some(frame))
}

/// Global table used by the mapping layer
static SHARED_PAGES: Once<SharedPageTable<&'static (dyn FrameAllocator + Sync)>> = Once::new();

/// Install the process-wide shared page table.
///
/// Must run once at boot, before any mapping operation. Further calls are
/// ignored.
pub fn init(allocator: &'static (dyn FrameAllocator + Sync)) {
    SHARED_PAGES.call_once(|| {
        log::info!("shared page table initialized ({} slots)", SHARED_PAGE_SLOTS);
        SharedPageTable::new(allocator)
    });
}

/// Look up or create the shared page for (device, inode, offset) in the
/// global table. Fails if [`init`] has not run yet.
pub fn get_shared_page(device: u32, inode: u32, offset: usize) -> SharedPageResult<Frame> {
    match SHARED_PAGES.get() {
        Some(table) => table.get(PageKey::new(device, inode, offset)),
        None => Err(SharedPageError::NoPageAvailable),
    }
}

/// Mark a shared page as populated in the global table
pub fn mark_shared_page_initialized(frame: Frame) {
    if let Some(table) = SHARED_PAGES.get() {
        table.mark_initialized(frame);
    }
}

/// Whether a shared page of the global table was already populated
pub fn is_shared_page_initialized(frame: Frame) -> bool {
    SHARED_PAGES.get().map_or(false, |table| table.is_initialized(frame))
}

/// Drop one reference to a shared page of the global table
pub fn release_shared_page(frame: Frame) {
    if let Some(table) = SHARED_PAGES.get() {
        table.release(frame);
    }
}
