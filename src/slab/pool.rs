//! Slab pool implementation
//!
//! One owning byte region split into pages. Pages are handed to size classes
//! on first demand and returned to the free-page set once every slot in them
//! has been freed. Requests above [`MAX_SLOT_SIZE`] take a run of contiguous
//! whole pages. Nothing is ever compacted or moved.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::size_class::{calculate_size_classes, SizeClass};
use super::slot::SlotId;
use super::{MAX_SLOT_SIZE, MIN_SLOT_SIZE, PAGE_SIZE};
use crate::error::{DictError, Result};

/// Smallest accepted region, in pages
const MIN_PAGES: usize = 2;

/// What a page is currently used for
#[derive(Debug)]
enum Page {
    /// Not assigned to anything
    Free,
    /// Split into slots of one size class; `free` holds unused slot indices
    Slab { class: u8, free: Vec<u16> },
    /// First page of a multi-page allocation
    Run { pages: u32 },
    /// Continuation page of a multi-page allocation
    RunTail,
}

/// Slab allocator over a fixed in-memory region
#[derive(Debug)]
pub struct SlabPool {
    /// The region itself; all slots are offsets into it
    region: Vec<u8>,
    /// Per-page bookkeeping
    pages: Vec<Page>,
    /// Size classes (sorted by size)
    classes: Vec<SizeClass>,
    /// Unassigned pages, lowest first
    free_pages: BTreeSet<u32>,
}

impl SlabPool {
    /// Create a pool over `capacity` bytes.
    ///
    /// The usable region is `capacity` rounded down to whole pages. Fails when
    /// fewer than two pages fit or when offsets would not fit in a `u32`.
    pub fn new(capacity: usize) -> Result<Self> {
        let page_count = capacity / PAGE_SIZE;
        if page_count < MIN_PAGES || capacity > u32::MAX as usize {
            return Err(DictError::InvalidCapacity(capacity));
        }

        let classes = calculate_size_classes(MIN_SLOT_SIZE, MAX_SLOT_SIZE)
            .into_iter()
            .map(SizeClass::new)
            .collect();

        Ok(Self {
            region: vec![0; page_count * PAGE_SIZE],
            pages: (0..page_count).map(|_| Page::Free).collect(),
            classes,
            free_pages: (0..page_count as u32).collect(),
        })
    }

    // == Allocate ==
    /// Allocate a slot of at least `size` bytes.
    ///
    /// Returns None when neither an existing page of the matching class nor
    /// enough free pages are available.
    pub fn allocate(&mut self, size: usize) -> Option<SlotId> {
        if size > MAX_SLOT_SIZE {
            return self.allocate_run(size.div_ceil(PAGE_SIZE));
        }

        let class = self.classes.iter().position(|sc| sc.can_fit(size))?;
        if let Some(slot) = self.take_slot(class) {
            return Some(slot);
        }

        let page = self.free_pages.pop_first()?;
        let slots = self.classes[class].slots_per_page();
        self.pages[page as usize] = Page::Slab {
            class: class as u8,
            free: (0..slots as u16).rev().collect(),
        };
        self.classes[class].assign_page(page);
        debug!(
            page,
            slot_size = self.classes[class].slot_size,
            "Assigned page to size class"
        );

        self.take_slot(class)
    }

    /// Pop a free slot from the first partial page of `class`
    fn take_slot(&mut self, class: usize) -> Option<SlotId> {
        let page = self.classes[class].partial_page()?;
        let Page::Slab { free, .. } = &mut self.pages[page as usize] else {
            return None;
        };
        let index = free.pop()?;
        if free.is_empty() {
            self.classes[class].mark_full(page);
        }

        let offset = page as usize * PAGE_SIZE + index as usize * self.classes[class].slot_size;
        Some(SlotId::new(offset as u32))
    }

    /// Claim `count` contiguous free pages, lowest run first
    fn allocate_run(&mut self, count: usize) -> Option<SlotId> {
        let mut start = 0;
        let mut run = 0;
        let mut previous: Option<u32> = None;
        let mut found = None;

        for &page in &self.free_pages {
            if previous.is_some_and(|p| p + 1 == page) {
                run += 1;
            } else {
                start = page;
                run = 1;
            }
            if run == count {
                found = Some(start);
                break;
            }
            previous = Some(page);
        }

        let start = found?;
        for page in start..start + count as u32 {
            self.free_pages.remove(&page);
            self.pages[page as usize] = Page::RunTail;
        }
        self.pages[start as usize] = Page::Run {
            pages: count as u32,
        };

        Some(SlotId::new((start as usize * PAGE_SIZE) as u32))
    }

    // == Free ==
    /// Return a slot to the pool.
    ///
    /// A class page whose slots are all free goes back to the free-page set.
    pub fn free(&mut self, slot: SlotId) {
        let page = slot.page();
        let Some(state) = self.pages.get_mut(page) else {
            warn!(%slot, "Free of a slot outside the region");
            return;
        };

        match state {
            Page::Slab { class, free } => {
                let class = *class as usize;
                let slot_size = self.classes[class].slot_size;
                let index = ((slot.offset() as usize % PAGE_SIZE) / slot_size) as u16;
                if free.contains(&index) {
                    warn!(%slot, "Free of a slot that is not allocated");
                    return;
                }
                free.push(index);

                if free.len() == self.classes[class].slots_per_page() {
                    *state = Page::Free;
                    self.classes[class].release_page(page as u32);
                    self.free_pages.insert(page as u32);
                } else {
                    self.classes[class].mark_partial(page as u32);
                }
            }
            Page::Run { pages } => {
                let pages = *pages;
                for p in page as u32..page as u32 + pages {
                    self.pages[p as usize] = Page::Free;
                    self.free_pages.insert(p);
                }
            }
            Page::Free | Page::RunTail => {
                warn!(%slot, "Free of a slot that is not allocated");
            }
        }
    }

    // == Introspection ==
    /// Whether a request of `size` bytes could succeed on an empty region
    pub fn can_ever_fit(&self, size: usize) -> bool {
        size.div_ceil(PAGE_SIZE).max(1) <= self.pages.len()
    }

    /// Pages an empty region needs to hold one slot of each size in `sizes`.
    ///
    /// Slots of one class are packed onto shared pages; larger requests take
    /// their own runs.
    pub fn pages_needed(&self, sizes: impl IntoIterator<Item = usize>) -> usize {
        let mut per_class = vec![0usize; self.classes.len()];
        let mut pages = 0;

        for size in sizes {
            match self.classes.iter().position(|sc| sc.can_fit(size)) {
                Some(class) => per_class[class] += 1,
                None => pages += size.div_ceil(PAGE_SIZE),
            }
        }

        pages
            + per_class
                .iter()
                .zip(&self.classes)
                .map(|(&count, sc)| count.div_ceil(sc.slots_per_page()))
                .sum::<usize>()
    }

    /// Bytes of free slots inside pages already assigned to a size class.
    ///
    /// Unassigned pages are not counted.
    pub fn free_space(&self) -> usize {
        self.pages
            .iter()
            .map(|page| match page {
                Page::Slab { class, free } => free.len() * self.classes[*class as usize].slot_size,
                _ => 0,
            })
            .sum()
    }

    /// Number of pages not assigned to any size class or run
    pub fn free_pages(&self) -> usize {
        self.free_pages.len()
    }

    /// Total number of pages in the region
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    // == Byte Access ==
    /// Borrow `len` bytes starting at `offset`
    pub fn bytes(&self, offset: u32, len: usize) -> &[u8] {
        let start = offset as usize;
        &self.region[start..start + len]
    }

    /// Mutably borrow `len` bytes starting at `offset`
    pub fn bytes_mut(&mut self, offset: u32, len: usize) -> &mut [u8] {
        let start = offset as usize;
        &mut self.region[start..start + len]
    }

    pub fn read_u32(&self, offset: u32) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.bytes(offset, 4));
        u32::from_le_bytes(buf)
    }

    pub fn write_u32(&mut self, offset: u32, value: u32) {
        self.bytes_mut(offset, 4).copy_from_slice(&value.to_le_bytes());
    }

    pub fn read_u64(&self, offset: u32) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.bytes(offset, 8));
        u64::from_le_bytes(buf)
    }

    pub fn write_u64(&mut self, offset: u32, value: u64) {
        self.bytes_mut(offset, 8).copy_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(pages: usize) -> SlabPool {
        SlabPool::new(pages * PAGE_SIZE).unwrap()
    }

    #[test]
    fn test_rejects_tiny_region() {
        assert!(matches!(
            SlabPool::new(PAGE_SIZE),
            Err(DictError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_rounds_down_to_pages() {
        let pool = SlabPool::new(3 * PAGE_SIZE + 100).unwrap();
        assert_eq!(pool.total_pages(), 3);
        assert_eq!(pool.free_pages(), 3);
    }

    #[test]
    fn test_allocate_picks_smallest_class() {
        let mut pool = pool(4);

        let a = pool.allocate(100).unwrap();
        let b = pool.allocate(100).unwrap();

        // Both come from the same 128-byte page, one slot apart
        assert_eq!(a.page(), b.page());
        assert_eq!(b.offset() - a.offset(), 128);
        assert_eq!(pool.free_pages(), 3);
        assert_eq!(pool.free_space(), PAGE_SIZE - 256);
    }

    #[test]
    fn test_free_reuses_slot() {
        let mut pool = pool(2);

        let a = pool.allocate(40).unwrap();
        let _b = pool.allocate(40).unwrap();
        pool.free(a);

        assert_eq!(pool.allocate(40).unwrap(), a);
    }

    #[test]
    fn test_empty_page_returns_to_pool() {
        let mut pool = pool(2);

        let slot = pool.allocate(16).unwrap();
        assert_eq!(pool.free_pages(), 1);

        pool.free(slot);
        assert_eq!(pool.free_pages(), 2);
        assert_eq!(pool.free_space(), 0);
    }

    #[test]
    fn test_free_space_excludes_unassigned_pages() {
        let pool = pool(8);
        assert_eq!(pool.free_space(), 0);
    }

    #[test]
    fn test_class_exhaustion_fails() {
        let mut pool = pool(2);

        // Each page holds two 2048-byte slots
        for _ in 0..4 {
            assert!(pool.allocate(2000).is_some());
        }
        assert!(pool.allocate(2000).is_none());
        // No page left for any other class either
        assert!(pool.allocate(8).is_none());
    }

    #[test]
    fn test_multi_page_run() {
        let mut pool = pool(4);

        let run = pool.allocate(PAGE_SIZE + 1).unwrap();
        assert_eq!(pool.free_pages(), 2);

        pool.free(run);
        assert_eq!(pool.free_pages(), 4);
    }

    #[test]
    fn test_run_needs_contiguous_pages() {
        let mut pool = pool(3);

        let first = pool.allocate(PAGE_SIZE).unwrap();
        let _middle = pool.allocate(PAGE_SIZE).unwrap();
        let _last = pool.allocate(PAGE_SIZE).unwrap();
        pool.free(first);

        // One free page, not two adjacent ones
        assert!(pool.allocate(2 * PAGE_SIZE).is_none());
        assert!(pool.allocate(PAGE_SIZE).is_some());
    }

    #[test]
    fn test_can_ever_fit() {
        let pool = pool(2);
        assert!(pool.can_ever_fit(1));
        assert!(pool.can_ever_fit(2 * PAGE_SIZE));
        assert!(!pool.can_ever_fit(2 * PAGE_SIZE + 1));
    }

    #[test]
    fn test_pages_needed() {
        let pool = pool(4);
        assert_eq!(pool.pages_needed([]), 0);
        // 32 slots of 128 bytes share one page, the 33rd opens another
        assert_eq!(pool.pages_needed(vec![100; 32]), 1);
        assert_eq!(pool.pages_needed(vec![100; 33]), 2);
        // Different classes never share a page
        assert_eq!(pool.pages_needed([8, 2048]), 2);
        assert_eq!(pool.pages_needed([PAGE_SIZE + 1, 3 * PAGE_SIZE, 16]), 6);
    }

    #[test]
    fn test_double_free_is_ignored() {
        let mut pool = pool(2);

        let slot = pool.allocate(PAGE_SIZE).unwrap();
        pool.free(slot);
        pool.free(slot);

        assert_eq!(pool.free_pages(), 2);
    }

    #[test]
    fn test_byte_helpers() {
        let mut pool = pool(2);
        let slot = pool.allocate(16).unwrap();

        pool.write_u32(slot.offset(), 0xdead_beef);
        pool.write_u64(slot.offset() + 4, u64::MAX - 1);

        assert_eq!(pool.read_u32(slot.offset()), 0xdead_beef);
        assert_eq!(pool.read_u64(slot.offset() + 4), u64::MAX - 1);
        assert_eq!(pool.bytes(slot.offset(), 4), &0xdead_beef_u32.to_le_bytes());
    }
}
