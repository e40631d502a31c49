//! Store Module
//!
//! Main dictionary engine: a hash index from key to entry record, the global
//! LRU order and lazy TTL expiry, all living inside one slab region.
//!
//! Every operation takes the current time in Unix milliseconds so that a
//! single operation sees one consistent clock.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::time::Duration;

use tracing::debug;

use super::entry::{self, EntryHeader, CHAIN};
use super::lru::LruList;
use super::stats::{DictStats, StatsSnapshot};
use super::value::{is_homogeneous, Scalar, Value, ValueKind};
use super::MAX_KEY_LENGTH;
use crate::error::{DictError, Result};
use crate::slab::{SlabPool, SlotId, NIL};

/// Expired entries reclaimed from the LRU tail before each allocation
const RECLAIM_BEFORE_ALLOC: usize = 2;

// == Write Mode ==
/// Precondition of a set-family write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Store unconditionally
    Set,
    /// Store only if no live entry exists
    Add,
    /// Store only if a live entry exists
    Replace,
}

// == Results ==
/// Outcome of a successful set-family write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stored {
    /// Whether unexpired entries were evicted to make room
    pub forcible: bool,
}

/// A value read back from the dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub value: Value,
    pub flags: u32,
    /// Set when the entry had already expired (stale reads only)
    pub stale: bool,
}

/// Outcome of a successful increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Incremented {
    pub value: f64,
    pub forcible: bool,
}

/// Keys returned by an enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keys {
    pub keys: Vec<Vec<u8>>,
    /// More live keys exist beyond the requested limit
    pub truncated: bool,
}

// == Store ==
/// Dictionary state guarded by a single lock in [`SharedDict`](super::SharedDict).
#[derive(Debug)]
pub struct Store {
    /// The region: every entry and list element is a slot in here
    pub(super) pool: SlabPool,
    /// Key hash to first entry of its collision chain
    index: HashMap<u64, u32>,
    hasher: RandomState,
    /// Recency order over all entries
    pub(super) lru: LruList,
    /// Configured size in bytes
    capacity: usize,
    pub(super) stats: DictStats,
}

impl Store {
    // == Constructor ==
    /// Creates an empty store over a region of `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            pool: SlabPool::new(capacity)?,
            index: HashMap::new(),
            hasher: RandomState::new(),
            lru: LruList::new(),
            capacity,
            stats: DictStats::new(),
        })
    }

    // == Get ==
    /// Retrieves a live value and marks it most recently used.
    ///
    /// Expired entries read as `NotFound` but stay in place for stale reads
    /// until they are reclaimed.
    pub fn get(&mut self, key: &[u8], now: u64) -> Result<Lookup> {
        let (_, found) = self.locate(key)?;
        match found {
            Some((at, header)) if !header.is_expired(now) => {
                let value = self.read_value(at, &header)?;
                self.lru.touch(&mut self.pool, at);
                self.stats.record_hit();
                Ok(Lookup {
                    value,
                    flags: header.flags,
                    stale: false,
                })
            }
            _ => {
                self.stats.record_miss();
                Err(DictError::NotFound)
            }
        }
    }

    // == Get Stale ==
    /// Retrieves a value whether or not it has expired.
    pub fn get_stale(&mut self, key: &[u8], now: u64) -> Result<Lookup> {
        let (_, found) = self.locate(key)?;
        let Some((at, header)) = found else {
            self.stats.record_miss();
            return Err(DictError::NotFound);
        };

        let value = self.read_value(at, &header)?;
        let stale = header.is_expired(now);
        if stale {
            self.stats.record_miss();
        } else {
            self.lru.touch(&mut self.pool, at);
            self.stats.record_hit();
        }

        Ok(Lookup {
            value,
            flags: header.flags,
            stale,
        })
    }

    // == Store ==
    /// Set-family write.
    ///
    /// A value that could not fit even an empty region is rejected with
    /// `NoMemory` before anything changes. Otherwise any existing binding is
    /// removed first. When the region is full and `evict` is set,
    /// least-recently-used entries are evicted until the new entry fits;
    /// otherwise the write fails with `NoMemory`. Writing [`Value::Nil`] only
    /// removes.
    pub fn store(
        &mut self,
        mode: WriteMode,
        key: &[u8],
        value: &Value,
        ttl: Duration,
        flags: u32,
        evict: bool,
        now: u64,
    ) -> Result<Stored> {
        let (hash, found) = self.locate(key)?;
        if let Value::List(items) = value {
            if !is_homogeneous(items) {
                return Err(DictError::MixedList);
            }
        }

        let live = found.filter(|(_, header)| !header.is_expired(now));
        match mode {
            WriteMode::Add if live.is_some() => return Err(DictError::Exists),
            WriteMode::Replace if live.is_none() => return Err(DictError::NotFound),
            _ => {}
        }

        let header = value
            .kind()
            .map(|kind| new_header(hash, key, kind, value, flags, entry::deadline(now, ttl)))
            .transpose()?;
        if let Some(header) = &header {
            let items: &[Scalar] = match value {
                Value::List(items) => items.as_slice(),
                _ => &[],
            };
            if !self.fits_empty_region(header.record_len(), items) {
                return Err(DictError::NoMemory);
            }
        }

        if let Some((at, _)) = found {
            self.remove_entry(at);
        }
        let Some(header) = header else {
            return Ok(Stored { forcible: false });
        };

        let (_, forcible) = self.insert(key, value, header, now, evict)?;
        Ok(Stored { forcible })
    }

    // == Delete ==
    /// Removes a key; absent keys are not an error.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if let (_, Some((at, _))) = self.locate(key)? {
            self.remove_entry(at);
        }
        Ok(())
    }

    // == Incr ==
    /// Adds `delta` to a numeric value.
    ///
    /// A missing or expired key is created as `init + delta` with `init_ttl`
    /// when `init` is given, and is `NotFound` otherwise.
    pub fn incr(
        &mut self,
        key: &[u8],
        delta: f64,
        init: Option<f64>,
        init_ttl: Duration,
        now: u64,
    ) -> Result<Incremented> {
        let (hash, found) = self.locate(key)?;

        if let Some((at, header)) = found.filter(|(_, h)| !h.is_expired(now)) {
            if header.kind != ValueKind::Number.tag() {
                return Err(DictError::NotANumber);
            }
            let value_at = header.value_offset(at);
            let value = f64::from_bits(self.pool.read_u64(value_at)) + delta;
            self.pool.write_u64(value_at, value.to_bits());
            self.lru.touch(&mut self.pool, at);
            return Ok(Incremented {
                value,
                forcible: false,
            });
        }

        let init = init.ok_or(DictError::NotFound)?;
        if let Some((at, _)) = found {
            self.remove_entry(at);
        }

        let value = Value::Number(init + delta);
        let header = new_header(
            hash,
            key,
            ValueKind::Number,
            &value,
            0,
            entry::deadline(now, init_ttl),
        )?;
        let (_, forcible) = self.insert(key, &value, header, now, true)?;
        Ok(Incremented {
            value: init + delta,
            forcible,
        })
    }

    // == TTL ==
    /// Remaining lifetime of a live entry; None when it never expires.
    pub fn ttl(&self, key: &[u8], now: u64) -> Result<Option<Duration>> {
        let (_, header) = self.live(key, now)?;
        Ok(header.ttl_remaining_ms(now).map(Duration::from_millis))
    }

    // == Expire ==
    /// Resets the lifetime of a live entry; `Duration::ZERO` means never.
    pub fn expire(&mut self, key: &[u8], ttl: Duration, now: u64) -> Result<()> {
        let (at, _) = self.live(key, now)?;
        entry::write_expires(&mut self.pool, at, entry::deadline(now, ttl));
        Ok(())
    }

    // == Flush All ==
    /// Marks every entry expired without freeing any memory.
    pub fn flush_all(&mut self) {
        let mut cur = self.lru.newest();
        while let Some(at) = cur {
            entry::write_expires(&mut self.pool, at, 1);
            cur = LruList::older(&self.pool, at);
        }
    }

    // == Flush Expired ==
    /// Frees up to `max_count` expired entries (0 = unlimited), oldest first.
    ///
    /// Returns the number of entries freed.
    pub fn flush_expired(&mut self, max_count: usize, now: u64) -> usize {
        let mut flushed = 0;
        let mut cur = self.lru.oldest();

        while let Some(at) = cur {
            if max_count != 0 && flushed == max_count {
                break;
            }
            cur = LruList::newer(&self.pool, at);
            if EntryHeader::read(&self.pool, at).is_expired(now) {
                self.remove_entry(at);
                flushed += 1;
            }
        }

        self.stats.record_reclaimed(flushed);
        flushed
    }

    // == Get Keys ==
    /// Up to `max_count` live keys (0 = unlimited), most recently used first.
    pub fn get_keys(&self, max_count: usize, now: u64) -> Keys {
        let mut keys = Keys::default();
        let mut cur = self.lru.newest();

        while let Some(at) = cur {
            cur = LruList::older(&self.pool, at);
            if EntryHeader::read(&self.pool, at).is_expired(now) {
                continue;
            }
            if max_count != 0 && keys.keys.len() == max_count {
                keys.truncated = true;
                break;
            }
            keys.keys.push(entry::key_of(&self.pool, at).to_vec());
        }

        keys
    }

    // == Introspection ==
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free bytes inside pages already assigned to a size class
    pub fn free_space(&self) -> usize {
        self.pool.free_space()
    }

    /// Number of entries held, expired ones not yet reclaimed included
    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            counters: self.stats.clone(),
            hit_rate: self.stats.hit_rate(),
            entries: self.len(),
            capacity: self.capacity,
            free_space: self.pool.free_space(),
            free_pages: self.pool.free_pages(),
        }
    }

    // == Internals ==

    /// Validates `key` and finds its entry, returning the key hash as well
    pub(super) fn locate(&self, key: &[u8]) -> Result<(u64, Option<(u32, EntryHeader)>)> {
        if key.is_empty() {
            return Err(DictError::EmptyKey);
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(DictError::KeyTooLong);
        }

        let hash = self.hasher.hash_one(key);
        let found = self
            .find(key, hash)
            .map(|at| (at, EntryHeader::read(&self.pool, at)));
        Ok((hash, found))
    }

    fn live(&self, key: &[u8], now: u64) -> Result<(u32, EntryHeader)> {
        let (_, found) = self.locate(key)?;
        found
            .filter(|(_, header)| !header.is_expired(now))
            .ok_or(DictError::NotFound)
    }

    fn find(&self, key: &[u8], hash: u64) -> Option<u32> {
        let mut cur = *self.index.get(&hash)?;
        while cur != NIL {
            if entry::key_of(&self.pool, cur) == key {
                return Some(cur);
            }
            cur = self.pool.read_u32(cur + CHAIN);
        }
        None
    }

    fn link_index(&mut self, at: u32, hash: u64) {
        let next = self.index.insert(hash, at).unwrap_or(NIL);
        self.pool.write_u32(at + CHAIN, next);
    }

    fn unlink_index(&mut self, at: u32, hash: u64) {
        let next = self.pool.read_u32(at + CHAIN);
        let Some(&head) = self.index.get(&hash) else {
            return;
        };

        if head == at {
            if next == NIL {
                self.index.remove(&hash);
            } else {
                self.index.insert(hash, next);
            }
            return;
        }

        let mut cur = head;
        while cur != NIL {
            let following = self.pool.read_u32(cur + CHAIN);
            if following == at {
                self.pool.write_u32(cur + CHAIN, next);
                return;
            }
            cur = following;
        }
    }

    /// Decodes the value of the entry at `at`
    pub(super) fn read_value(&self, at: u32, header: &EntryHeader) -> Result<Value> {
        let kind = ValueKind::from_tag(header.kind).ok_or(DictError::Corrupted(at))?;
        let value_at = header.value_offset(at);

        match kind {
            ValueKind::List => Ok(Value::List(self.list_items(value_at)?)),
            _ => Value::decode_scalar(kind, self.pool.bytes(value_at, header.value_len as usize))
                .ok_or(DictError::Corrupted(at)),
        }
    }

    /// Allocates and links a new entry, returning its offset.
    ///
    /// List elements are pushed after the entry is linked so that eviction
    /// can skip it; if any element does not fit the entry is removed again.
    pub(super) fn insert(
        &mut self,
        key: &[u8],
        value: &Value,
        header: EntryHeader,
        now: u64,
        evict: bool,
    ) -> Result<(u32, bool)> {
        let (slot, mut forcible) = self.allocate(header.record_len(), now, evict, None)?;
        let at = slot.offset();

        header.write(&mut self.pool, at);
        self.pool
            .bytes_mut(EntryHeader::key_offset(at), key.len())
            .copy_from_slice(key);

        let value_at = header.value_offset(at);
        match value {
            Value::List(_) => self.init_list(value_at),
            _ => value.encode_scalar(self.pool.bytes_mut(value_at, header.value_len as usize)),
        }

        self.link_index(at, header.hash);
        self.lru.push_front(&mut self.pool, at);

        if let Value::List(items) = value {
            for item in items {
                match self.push_element(at, value_at, item, super::End::Back, now, evict) {
                    Ok(evicted) => forcible |= evicted,
                    Err(err) => {
                        self.remove_entry(at);
                        return Err(err);
                    }
                }
            }
        }

        Ok((at, forcible))
    }

    /// Unlinks an entry and frees its slot, list elements included
    pub(super) fn remove_entry(&mut self, at: u32) {
        let header = EntryHeader::read(&self.pool, at);
        self.unlink_index(at, header.hash);
        self.lru.remove(&mut self.pool, at);
        if header.kind == ValueKind::List.tag() {
            self.free_list_elements(header.value_offset(at));
        }
        self.pool.free(SlotId::new(at));
    }

    /// Allocates `size` bytes, reclaiming and evicting as allowed.
    ///
    /// The entry at `protect`, if any, is never reclaimed or evicted. The
    /// returned flag reports whether a live entry was evicted.
    pub(super) fn allocate(
        &mut self,
        size: usize,
        now: u64,
        evict: bool,
        protect: Option<u32>,
    ) -> Result<(SlotId, bool)> {
        if !self.pool.can_ever_fit(size) {
            return Err(DictError::NoMemory);
        }
        self.reclaim_expired_tail(now, protect);

        let mut forcible = false;
        loop {
            if let Some(slot) = self.pool.allocate(size) {
                return Ok((slot, forcible));
            }
            if !evict {
                return Err(DictError::NoMemory);
            }
            let Some(victim) = self.lru.oldest().filter(|&at| Some(at) != protect) else {
                return Err(DictError::NoMemory);
            };

            if EntryHeader::read(&self.pool, victim).is_expired(now) {
                self.stats.record_reclaimed(1);
            } else {
                forcible = true;
                self.stats.record_eviction();
            }
            debug!(offset = victim, size, "Evicting least recently used entry");
            self.remove_entry(victim);
        }
    }

    /// Frees a few expired entries sitting at the LRU tail
    fn reclaim_expired_tail(&mut self, now: u64, protect: Option<u32>) {
        for _ in 0..RECLAIM_BEFORE_ALLOC {
            let Some(at) = self.lru.oldest() else {
                break;
            };
            if Some(at) == protect || !EntryHeader::read(&self.pool, at).is_expired(now) {
                break;
            }
            self.remove_entry(at);
            self.stats.record_reclaimed(1);
        }
    }
}

/// Header for an entry about to be written.
///
/// Keys are already bounded by [`MAX_KEY_LENGTH`]; a value whose length does
/// not fit the header can never be stored.
pub(super) fn new_header(
    hash: u64,
    key: &[u8],
    kind: ValueKind,
    value: &Value,
    flags: u32,
    expires_at: u64,
) -> Result<EntryHeader> {
    Ok(EntryHeader {
        flags,
        expires_at,
        hash,
        key_len: key.len() as u32,
        value_len: encoded_len_u32(value.encoded_len())?,
        kind: kind.tag(),
    })
}

/// Payload length as stored in a header
pub(super) fn encoded_len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| DictError::NoMemory)
}
