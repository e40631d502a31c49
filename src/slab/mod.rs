//! Slab Module
//!
//! Fixed-capacity memory region carved into pages and size-classed slots.

mod pool;
mod size_class;
mod slot;

pub use pool::SlabPool;
pub use size_class::{calculate_size_classes, SizeClass};
pub use slot::{SlotId, NIL};

// == Public Constants ==
/// Size of one page of the region in bytes
pub const PAGE_SIZE: usize = 4096;

/// Smallest slot size in bytes
pub const MIN_SLOT_SIZE: usize = 8;

/// Largest slot size served from a size class; bigger requests take whole pages
pub const MAX_SLOT_SIZE: usize = PAGE_SIZE / 2;
