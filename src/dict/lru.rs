//! LRU List Module
//!
//! Least-recently-used order threaded through the entry records themselves.
//!
//! Every entry carries a `prev`/`next` pair at a fixed position of its slot:
//! - head = most recently used
//! - tail = least recently used

use super::entry::{LRU_NEXT, LRU_PREV};
use crate::slab::{SlabPool, NIL};

// == LRU List ==
/// Ends and length of the intrusive recency list.
#[derive(Debug)]
pub struct LruList {
    head: u32,
    tail: u32,
    len: usize,
}

impl Default for LruList {
    fn default() -> Self {
        Self::new()
    }
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    // == Push Front ==
    /// Links the entry at `at` in as the most recently used.
    pub fn push_front(&mut self, pool: &mut SlabPool, at: u32) {
        pool.write_u32(at + LRU_PREV, NIL);
        pool.write_u32(at + LRU_NEXT, self.head);

        if self.head == NIL {
            self.tail = at;
        } else {
            pool.write_u32(self.head + LRU_PREV, at);
        }
        self.head = at;
        self.len += 1;
    }

    // == Remove ==
    /// Unlinks the entry at `at`.
    pub fn remove(&mut self, pool: &mut SlabPool, at: u32) {
        let prev = pool.read_u32(at + LRU_PREV);
        let next = pool.read_u32(at + LRU_NEXT);

        if prev == NIL {
            self.head = next;
        } else {
            pool.write_u32(prev + LRU_NEXT, next);
        }
        if next == NIL {
            self.tail = prev;
        } else {
            pool.write_u32(next + LRU_PREV, prev);
        }
        self.len -= 1;
    }

    // == Touch ==
    /// Marks an entry as recently used (moves to front).
    pub fn touch(&mut self, pool: &mut SlabPool, at: u32) {
        if self.head != at {
            self.remove(pool, at);
            self.push_front(pool, at);
        }
    }

    /// The least recently used entry
    pub fn oldest(&self) -> Option<u32> {
        link(self.tail)
    }

    /// The most recently used entry
    pub fn newest(&self) -> Option<u32> {
        link(self.head)
    }

    /// The entry used just before `at`, walking towards the tail
    pub fn older(pool: &SlabPool, at: u32) -> Option<u32> {
        link(pool.read_u32(at + LRU_NEXT))
    }

    /// The entry used just after `at`, walking towards the head
    pub fn newer(pool: &SlabPool, at: u32) -> Option<u32> {
        link(pool.read_u32(at + LRU_PREV))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn link(offset: u32) -> Option<u32> {
    (offset != NIL).then_some(offset)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::entry::HEADER_LEN;
    use crate::slab::PAGE_SIZE;

    fn setup(n: usize) -> (SlabPool, Vec<u32>) {
        let mut pool = SlabPool::new(2 * PAGE_SIZE).unwrap();
        let slots = (0..n)
            .map(|_| pool.allocate(HEADER_LEN).unwrap().offset())
            .collect();
        (pool, slots)
    }

    /// Entries from least to most recently used
    fn drain_order(lru: &LruList, pool: &SlabPool) -> Vec<u32> {
        let mut order = Vec::new();
        let mut cur = lru.oldest();
        while let Some(at) = cur {
            order.push(at);
            cur = LruList::newer(pool, at);
        }
        order
    }

    #[test]
    fn test_lru_new() {
        let lru = LruList::new();
        assert!(lru.is_empty());
        assert_eq!(lru.oldest(), None);
        assert_eq!(lru.newest(), None);
    }

    #[test]
    fn test_lru_push_order() {
        let (mut pool, e) = setup(3);
        let mut lru = LruList::new();

        for &at in &e {
            lru.push_front(&mut pool, at);
        }

        assert_eq!(lru.len(), 3);
        // e[0] is oldest (added first)
        assert_eq!(lru.oldest(), Some(e[0]));
        assert_eq!(lru.newest(), Some(e[2]));
        assert_eq!(drain_order(&lru, &pool), vec![e[0], e[1], e[2]]);
    }

    #[test]
    fn test_lru_touch_moves_to_front() {
        let (mut pool, e) = setup(3);
        let mut lru = LruList::new();
        for &at in &e {
            lru.push_front(&mut pool, at);
        }

        lru.touch(&mut pool, e[0]);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.oldest(), Some(e[1]));
        assert_eq!(drain_order(&lru, &pool), vec![e[1], e[2], e[0]]);
    }

    #[test]
    fn test_lru_touch_head_is_noop() {
        let (mut pool, e) = setup(2);
        let mut lru = LruList::new();
        lru.push_front(&mut pool, e[0]);
        lru.push_front(&mut pool, e[1]);

        lru.touch(&mut pool, e[1]);

        assert_eq!(drain_order(&lru, &pool), vec![e[0], e[1]]);
    }

    #[test]
    fn test_lru_remove_middle_and_ends() {
        let (mut pool, e) = setup(4);
        let mut lru = LruList::new();
        for &at in &e {
            lru.push_front(&mut pool, at);
        }

        lru.remove(&mut pool, e[2]);
        assert_eq!(drain_order(&lru, &pool), vec![e[0], e[1], e[3]]);

        lru.remove(&mut pool, e[0]);
        lru.remove(&mut pool, e[3]);
        assert_eq!(drain_order(&lru, &pool), vec![e[1]]);
        assert_eq!(lru.oldest(), lru.newest());

        lru.remove(&mut pool, e[1]);
        assert!(lru.is_empty());
        assert_eq!(lru.oldest(), None);
    }

    #[test]
    fn test_lru_walk_towards_tail() {
        let (mut pool, e) = setup(3);
        let mut lru = LruList::new();
        for &at in &e {
            lru.push_front(&mut pool, at);
        }

        assert_eq!(LruList::older(&pool, e[2]), Some(e[1]));
        assert_eq!(LruList::older(&pool, e[0]), None);
        assert_eq!(LruList::newer(&pool, e[2]), None);
    }
}
