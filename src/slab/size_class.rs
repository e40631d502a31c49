//! Size class management for the slab allocator

use std::collections::BTreeSet;

use super::PAGE_SIZE;

/// A size class hands out slots of one fixed size.
///
/// Pages are assigned to a class on demand. The class only remembers which of
/// its pages still have a free slot; the free slots themselves live with the
/// page metadata in the pool.
#[derive(Debug)]
pub struct SizeClass {
    /// Size of slots in this class (bytes)
    pub slot_size: usize,
    /// Pages of this class with at least one free slot, lowest first
    partial: BTreeSet<u32>,
}

impl SizeClass {
    /// Create a new size class
    pub fn new(slot_size: usize) -> Self {
        Self {
            slot_size,
            partial: BTreeSet::new(),
        }
    }

    /// Number of slots one page of this class is split into
    pub fn slots_per_page(&self) -> usize {
        PAGE_SIZE / self.slot_size
    }

    /// Check if a given size fits in this size class
    pub fn can_fit(&self, size: usize) -> bool {
        size <= self.slot_size
    }

    /// First page with a free slot, if any
    pub fn partial_page(&self) -> Option<u32> {
        self.partial.first().copied()
    }

    /// Record that `page` has at least one free slot
    pub fn mark_partial(&mut self, page: u32) {
        self.partial.insert(page);
    }

    /// Record that `page` has no free slot left, or left the class
    pub fn mark_full(&mut self, page: u32) {
        self.partial.remove(&page);
    }

    /// Account for a page joining this class
    pub fn assign_page(&mut self, page: u32) {
        self.partial.insert(page);
    }

    /// Account for a fully free page leaving this class
    pub fn release_page(&mut self, page: u32) {
        self.partial.remove(&page);
    }
}

/// Calculate doubling size classes from `min_size` up to `max_size`
///
/// Returns a vector of slot sizes: [8, 16, 32, ..., 2048]
pub fn calculate_size_classes(min_size: usize, max_size: usize) -> Vec<usize> {
    let mut classes = Vec::new();
    let mut current = min_size;

    while current <= max_size {
        classes.push(current);
        current *= 2;
    }

    classes
}
