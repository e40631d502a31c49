//! Shared Dictionary Module
//!
//! The public face of one dictionary: a [`Store`] behind a single mutex.
//! Every method is one short critical section that either completes or
//! fails as a whole.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::entry::current_timestamp_ms;
use super::list::End;
use super::stats::StatsSnapshot;
use super::store::{Incremented, Keys, Lookup, Store, Stored, WriteMode};
use super::value::{Scalar, Value};
use crate::error::Result;

// == Shared Dict ==
/// A named, fixed-capacity dictionary shared between threads.
///
/// Wrap it in an `Arc` to share it. TTLs are durations with millisecond
/// resolution where `Duration::ZERO` means the entry never expires.
#[derive(Debug)]
pub struct SharedDict {
    name: String,
    store: Mutex<Store>,
}

impl SharedDict {
    // == Constructor ==
    /// Creates a dictionary over a region of `capacity` bytes.
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self> {
        let name = name.into();
        let store = Store::new(capacity)?;
        info!(zone = %name, capacity, "Shared dictionary created");

        Ok(Self {
            name,
            store: Mutex::new(store),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Reads ==
    /// Retrieves a live value and its flags.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Lookup> {
        self.store.lock().get(key.as_ref(), current_timestamp_ms())
    }

    /// Retrieves a value even if it has expired; `stale` tells which.
    pub fn get_stale(&self, key: impl AsRef<[u8]>) -> Result<Lookup> {
        self.store.lock().get_stale(key.as_ref(), current_timestamp_ms())
    }

    // == Set Family ==
    /// Stores unconditionally, evicting least recently used entries if needed.
    pub fn set(
        &self,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        ttl: Duration,
        flags: u32,
    ) -> Result<Stored> {
        self.write(WriteMode::Set, key.as_ref(), value.into(), ttl, flags, true)
    }

    /// Like [`set`](Self::set) but fails with `NoMemory` instead of evicting.
    pub fn safe_set(
        &self,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        ttl: Duration,
        flags: u32,
    ) -> Result<Stored> {
        self.write(WriteMode::Set, key.as_ref(), value.into(), ttl, flags, false)
    }

    /// Stores only if the key is absent or expired.
    pub fn add(
        &self,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        ttl: Duration,
        flags: u32,
    ) -> Result<Stored> {
        self.write(WriteMode::Add, key.as_ref(), value.into(), ttl, flags, true)
    }

    /// Like [`add`](Self::add) but fails with `NoMemory` instead of evicting.
    pub fn safe_add(
        &self,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        ttl: Duration,
        flags: u32,
    ) -> Result<Stored> {
        self.write(WriteMode::Add, key.as_ref(), value.into(), ttl, flags, false)
    }

    /// Stores only if the key is present and unexpired.
    pub fn replace(
        &self,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        ttl: Duration,
        flags: u32,
    ) -> Result<Stored> {
        self.write(WriteMode::Replace, key.as_ref(), value.into(), ttl, flags, true)
    }

    /// Removes a key; same as setting it to [`Value::Nil`].
    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        self.store.lock().delete(key.as_ref())
    }

    fn write(
        &self,
        mode: WriteMode,
        key: &[u8],
        value: Value,
        ttl: Duration,
        flags: u32,
        evict: bool,
    ) -> Result<Stored> {
        let stored = self.store.lock().store(
            mode,
            key,
            &value,
            ttl,
            flags,
            evict,
            current_timestamp_ms(),
        )?;
        if stored.forcible {
            debug!(zone = %self.name, "Write evicted unexpired entries");
        }
        Ok(stored)
    }

    // == Counters ==
    /// Adds `delta` to a number, creating it from `init` if absent.
    pub fn incr(
        &self,
        key: impl AsRef<[u8]>,
        delta: f64,
        init: Option<f64>,
        init_ttl: Duration,
    ) -> Result<Incremented> {
        self.store
            .lock()
            .incr(key.as_ref(), delta, init, init_ttl, current_timestamp_ms())
    }

    // == Lists ==
    /// Inserts at the head of a list; returns the new length.
    pub fn lpush(&self, key: impl AsRef<[u8]>, item: impl Into<Scalar>) -> Result<usize> {
        self.push(key.as_ref(), item.into(), End::Front)
    }

    /// Inserts at the tail of a list; returns the new length.
    pub fn rpush(&self, key: impl AsRef<[u8]>, item: impl Into<Scalar>) -> Result<usize> {
        self.push(key.as_ref(), item.into(), End::Back)
    }

    fn push(&self, key: &[u8], item: Scalar, end: End) -> Result<usize> {
        self.store
            .lock()
            .push(key, item, end, current_timestamp_ms())
    }

    /// Removes and returns the head of a list.
    pub fn lpop(&self, key: impl AsRef<[u8]>) -> Result<Scalar> {
        self.store
            .lock()
            .pop(key.as_ref(), End::Front, current_timestamp_ms())
    }

    /// Removes and returns the tail of a list.
    pub fn rpop(&self, key: impl AsRef<[u8]>) -> Result<Scalar> {
        self.store
            .lock()
            .pop(key.as_ref(), End::Back, current_timestamp_ms())
    }

    /// Number of list elements; 0 for a missing key.
    pub fn llen(&self, key: impl AsRef<[u8]>) -> Result<usize> {
        self.store.lock().llen(key.as_ref(), current_timestamp_ms())
    }

    // == Expiry ==
    /// Remaining lifetime of a live entry; None if it never expires.
    pub fn ttl(&self, key: impl AsRef<[u8]>) -> Result<Option<Duration>> {
        self.store.lock().ttl(key.as_ref(), current_timestamp_ms())
    }

    /// Resets the lifetime of a live entry.
    pub fn expire(&self, key: impl AsRef<[u8]>, ttl: Duration) -> Result<()> {
        self.store
            .lock()
            .expire(key.as_ref(), ttl, current_timestamp_ms())
    }

    /// Marks every entry expired; memory is freed later.
    pub fn flush_all(&self) {
        self.store.lock().flush_all();
        debug!(zone = %self.name, "Flushed all entries");
    }

    /// Frees up to `max_count` expired entries (0 = unlimited).
    pub fn flush_expired(&self, max_count: usize) -> usize {
        self.store
            .lock()
            .flush_expired(max_count, current_timestamp_ms())
    }

    // == Introspection ==
    /// Up to `max_count` live keys (0 = unlimited).
    ///
    /// Holds the lock for the whole walk; keep `max_count` small on large
    /// dictionaries.
    pub fn get_keys(&self, max_count: usize) -> Keys {
        self.store
            .lock()
            .get_keys(max_count, current_timestamp_ms())
    }

    /// The configured size in bytes.
    pub fn capacity(&self) -> usize {
        self.store.lock().capacity()
    }

    /// Free bytes in pages already assigned to a size class.
    ///
    /// Does not count unassigned pages, so it is no promise either way about
    /// whether the next write fits.
    pub fn free_space(&self) -> usize {
        self.store.lock().free_space()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.store.lock().stats()
    }
}
