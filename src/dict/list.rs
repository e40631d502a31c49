//! List Module
//!
//! Double-ended lists. The entry value holds only `(head, tail, len)`; every
//! element is its own slot, linked to its neighbours:
//!
//! ```text
//!  0  prev   u32
//!  4  next   u32
//!  8  kind   u8
//! 12  len    u32
//! 16  payload
//! ```

use std::iter;
use std::slice;

use super::store::{encoded_len_u32, new_header, Store};
use super::value::{Scalar, Value, ValueKind};
use crate::error::{DictError, Result};
use crate::slab::{SlotId, NIL};

const LIST_HEAD: u32 = 0;
const LIST_TAIL: u32 = 4;
const LIST_LEN: u32 = 8;

const ELEM_PREV: u32 = 0;
const ELEM_NEXT: u32 = 4;
const ELEM_KIND: u32 = 8;
const ELEM_LEN: u32 = 12;
const ELEM_HEADER_LEN: usize = 16;

/// Which end of a list to push to or pop from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Front,
    Back,
}

impl Store {
    // == Push ==
    /// Inserts `item` at one end of the list under `key`; returns the new length.
    ///
    /// A missing or expired key becomes a new empty list first. A push never
    /// forces out live entries: only expired ones are reclaimed to make room
    /// for the list and its element.
    pub fn push(&mut self, key: &[u8], item: Scalar, end: End, now: u64) -> Result<usize> {
        let (hash, found) = self.locate(key)?;

        let (at, list_at, created) = match found.filter(|(_, h)| !h.is_expired(now)) {
            Some((at, header)) => {
                if header.kind != ValueKind::List.tag() {
                    return Err(DictError::NotAList);
                }
                let list_at = header.value_offset(at);
                if let Some(kind) = self.first_element_kind(list_at)? {
                    if kind != item.kind() {
                        return Err(DictError::MixedList);
                    }
                }
                (at, list_at, false)
            }
            None => {
                let empty = Value::List(Vec::new());
                let header = new_header(hash, key, ValueKind::List, &empty, 0, 0)?;
                if !self.fits_empty_region(header.record_len(), slice::from_ref(&item)) {
                    return Err(DictError::NoMemory);
                }
                if let Some((at, _)) = found {
                    self.remove_entry(at);
                }
                let (at, _) = self.insert(key, &empty, header, now, false)?;
                (at, header.value_offset(at), true)
            }
        };

        if let Err(err) = self.push_element(at, list_at, &item, end, now, false) {
            if created {
                self.remove_entry(at);
            }
            return Err(err);
        }

        self.lru.touch(&mut self.pool, at);
        Ok(self.list_len(list_at))
    }

    // == Pop ==
    /// Removes and returns the element at one end of the list under `key`.
    ///
    /// A list that exists but has no elements yields `EmptyList`, distinct
    /// from the `NotFound` of a missing key. Taking the last element leaves
    /// the empty list in place.
    pub fn pop(&mut self, key: &[u8], end: End, now: u64) -> Result<Scalar> {
        let (_, found) = self.locate(key)?;
        let (at, header) = found
            .filter(|(_, h)| !h.is_expired(now))
            .ok_or(DictError::NotFound)?;
        if header.kind != ValueKind::List.tag() {
            return Err(DictError::NotAList);
        }

        let list_at = header.value_offset(at);
        if self.list_len(list_at) == 0 {
            return Err(DictError::EmptyList);
        }

        let item = self.pop_element(list_at, end)?;
        self.lru.touch(&mut self.pool, at);
        Ok(item)
    }

    // == Length ==
    /// Number of elements; a missing or expired key counts as an empty list.
    pub fn llen(&self, key: &[u8], now: u64) -> Result<usize> {
        let (_, found) = self.locate(key)?;
        match found.filter(|(_, h)| !h.is_expired(now)) {
            None => Ok(0),
            Some((at, header)) if header.kind == ValueKind::List.tag() => {
                Ok(self.list_len(header.value_offset(at)))
            }
            Some(_) => Err(DictError::NotAList),
        }
    }

    // == Internals ==

    pub(super) fn init_list(&mut self, list_at: u32) {
        self.pool.write_u32(list_at + LIST_HEAD, NIL);
        self.pool.write_u32(list_at + LIST_TAIL, NIL);
        self.pool.write_u32(list_at + LIST_LEN, 0);
    }

    /// Whether an empty region could hold a record of `record_len` bytes
    /// together with one element slot per item
    pub(super) fn fits_empty_region(&self, record_len: usize, items: &[Scalar]) -> bool {
        let elements = items.iter().map(|item| ELEM_HEADER_LEN + item.encoded_len());
        self.pool.pages_needed(iter::once(record_len).chain(elements)) <= self.pool.total_pages()
    }

    fn list_len(&self, list_at: u32) -> usize {
        self.pool.read_u32(list_at + LIST_LEN) as usize
    }

    /// Allocates an element slot for `item` and links it at `end`.
    ///
    /// The owning entry at `at` is protected from reclamation meanwhile.
    /// Returns whether a live entry was evicted.
    pub(super) fn push_element(
        &mut self,
        at: u32,
        list_at: u32,
        item: &Scalar,
        end: End,
        now: u64,
        evict: bool,
    ) -> Result<bool> {
        let len = item.encoded_len();
        let encoded_len = encoded_len_u32(len)?;
        let (slot, forcible) = self.allocate(ELEM_HEADER_LEN + len, now, evict, Some(at))?;
        let el = slot.offset();

        self.pool.bytes_mut(el + ELEM_KIND, 1)[0] = item.kind().tag();
        self.pool.write_u32(el + ELEM_LEN, encoded_len);
        item.encode(self.pool.bytes_mut(el + ELEM_HEADER_LEN as u32, len));

        let head = self.pool.read_u32(list_at + LIST_HEAD);
        let tail = self.pool.read_u32(list_at + LIST_TAIL);
        match end {
            End::Front => {
                self.pool.write_u32(el + ELEM_PREV, NIL);
                self.pool.write_u32(el + ELEM_NEXT, head);
                if head == NIL {
                    self.pool.write_u32(list_at + LIST_TAIL, el);
                } else {
                    self.pool.write_u32(head + ELEM_PREV, el);
                }
                self.pool.write_u32(list_at + LIST_HEAD, el);
            }
            End::Back => {
                self.pool.write_u32(el + ELEM_NEXT, NIL);
                self.pool.write_u32(el + ELEM_PREV, tail);
                if tail == NIL {
                    self.pool.write_u32(list_at + LIST_HEAD, el);
                } else {
                    self.pool.write_u32(tail + ELEM_NEXT, el);
                }
                self.pool.write_u32(list_at + LIST_TAIL, el);
            }
        }

        let count = self.pool.read_u32(list_at + LIST_LEN);
        self.pool.write_u32(list_at + LIST_LEN, count + 1);
        Ok(forcible)
    }

    /// Unlinks and frees the element at `end` of a non-empty list
    fn pop_element(&mut self, list_at: u32, end: End) -> Result<Scalar> {
        let el = match end {
            End::Front => self.pool.read_u32(list_at + LIST_HEAD),
            End::Back => self.pool.read_u32(list_at + LIST_TAIL),
        };
        let item = self.read_element(el)?;

        let prev = self.pool.read_u32(el + ELEM_PREV);
        let next = self.pool.read_u32(el + ELEM_NEXT);
        match end {
            End::Front => {
                self.pool.write_u32(list_at + LIST_HEAD, next);
                if next == NIL {
                    self.pool.write_u32(list_at + LIST_TAIL, NIL);
                } else {
                    self.pool.write_u32(next + ELEM_PREV, NIL);
                }
            }
            End::Back => {
                self.pool.write_u32(list_at + LIST_TAIL, prev);
                if prev == NIL {
                    self.pool.write_u32(list_at + LIST_HEAD, NIL);
                } else {
                    self.pool.write_u32(prev + ELEM_NEXT, NIL);
                }
            }
        }

        let count = self.pool.read_u32(list_at + LIST_LEN);
        self.pool.write_u32(list_at + LIST_LEN, count.saturating_sub(1));
        self.pool.free(SlotId::new(el));
        Ok(item)
    }

    fn read_element(&self, el: u32) -> Result<Scalar> {
        let kind = ValueKind::from_tag(self.pool.bytes(el + ELEM_KIND, 1)[0])
            .ok_or(DictError::Corrupted(el))?;
        let len = self.pool.read_u32(el + ELEM_LEN) as usize;
        Scalar::decode(kind, self.pool.bytes(el + ELEM_HEADER_LEN as u32, len))
            .ok_or(DictError::Corrupted(el))
    }

    fn first_element_kind(&self, list_at: u32) -> Result<Option<ValueKind>> {
        let head = self.pool.read_u32(list_at + LIST_HEAD);
        if head == NIL {
            return Ok(None);
        }
        ValueKind::from_tag(self.pool.bytes(head + ELEM_KIND, 1)[0])
            .map(Some)
            .ok_or(DictError::Corrupted(head))
    }

    /// All elements from head to tail
    pub(super) fn list_items(&self, list_at: u32) -> Result<Vec<Scalar>> {
        let mut items = Vec::with_capacity(self.list_len(list_at));
        let mut cur = self.pool.read_u32(list_at + LIST_HEAD);
        while cur != NIL {
            items.push(self.read_element(cur)?);
            cur = self.pool.read_u32(cur + ELEM_NEXT);
        }
        Ok(items)
    }

    pub(super) fn free_list_elements(&mut self, list_at: u32) {
        let mut cur = self.pool.read_u32(list_at + LIST_HEAD);
        while cur != NIL {
            let next = self.pool.read_u32(cur + ELEM_NEXT);
            self.pool.free(SlotId::new(cur));
            cur = next;
        }
    }
}
