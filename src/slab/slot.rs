//! Slot handles for the slab allocator

use std::fmt;

/// Null link value for offsets stored inside the region.
///
/// Slot offsets are always multiples of the minimum slot size, so this value
/// can never name a real slot.
pub const NIL: u32 = u32::MAX;

/// Handle to an allocated slot: its byte offset inside the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u32);

impl SlotId {
    /// Create a slot handle from a region offset
    pub fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Byte offset of the slot inside the region
    pub fn offset(self) -> u32 {
        self.0
    }

    /// Index of the page the slot starts in
    pub fn page(self) -> usize {
        self.0 as usize / super::PAGE_SIZE
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot(page={}, offset={})", self.page(), self.0)
    }
}
