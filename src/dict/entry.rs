//! Entry Module
//!
//! Layout of an entry record inside its slot, plus the expiry arithmetic.
//!
//! ```text
//!  0  lru prev   u32    towards most recently used
//!  4  lru next   u32    towards least recently used
//!  8  chain      u32    next entry with the same key hash
//! 12  flags      u32
//! 16  expires    u64    absolute Unix ms, 0 = never
//! 24  hash       u64
//! 32  key len    u32
//! 36  value len  u32
//! 40  kind       u8
//! 48  key bytes, then value bytes
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::slab::SlabPool;

pub const LRU_PREV: u32 = 0;
pub const LRU_NEXT: u32 = 4;
pub const CHAIN: u32 = 8;
const FLAGS: u32 = 12;
const EXPIRES: u32 = 16;
const HASH: u32 = 24;
const KEY_LEN: u32 = 32;
const VALUE_LEN: u32 = 36;
const KIND: u32 = 40;

/// Bytes in front of the key in every entry slot
pub const HEADER_LEN: usize = 48;

// == Entry Header ==
/// The non-link fields of an entry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Opaque user flags
    pub flags: u32,
    /// Expiration timestamp (Unix milliseconds), 0 = no expiration
    pub expires_at: u64,
    pub hash: u64,
    pub key_len: u32,
    pub value_len: u32,
    /// Raw [`ValueKind`](super::ValueKind) tag
    pub kind: u8,
}

impl EntryHeader {
    /// Reads the header of the entry at `at`
    pub fn read(pool: &SlabPool, at: u32) -> Self {
        Self {
            flags: pool.read_u32(at + FLAGS),
            expires_at: pool.read_u64(at + EXPIRES),
            hash: pool.read_u64(at + HASH),
            key_len: pool.read_u32(at + KEY_LEN),
            value_len: pool.read_u32(at + VALUE_LEN),
            kind: pool.bytes(at + KIND, 1)[0],
        }
    }

    /// Writes the header of the entry at `at`, leaving its links untouched
    pub fn write(&self, pool: &mut SlabPool, at: u32) {
        pool.write_u32(at + FLAGS, self.flags);
        pool.write_u64(at + EXPIRES, self.expires_at);
        pool.write_u64(at + HASH, self.hash);
        pool.write_u32(at + KEY_LEN, self.key_len);
        pool.write_u32(at + VALUE_LEN, self.value_len);
        pool.bytes_mut(at + KIND, 1)[0] = self.kind;
    }

    /// Total bytes the entry needs in its slot
    pub fn record_len(&self) -> usize {
        HEADER_LEN + self.key_len as usize + self.value_len as usize
    }

    /// Offset of the key bytes of the entry at `at`
    pub fn key_offset(at: u32) -> u32 {
        at + HEADER_LEN as u32
    }

    /// Offset of the value bytes of the entry at `at`
    pub fn value_offset(&self, at: u32) -> u32 {
        Self::key_offset(at) + self.key_len
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired(&self, now: u64) -> bool {
        is_expired(self.expires_at, now)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self, now: u64) -> Option<u64> {
        match self.expires_at {
            0 => None,
            expires => Some(expires.saturating_sub(now)),
        }
    }
}

/// Borrows the key bytes of the entry at `at`
pub fn key_of(pool: &SlabPool, at: u32) -> &[u8] {
    let len = pool.read_u32(at + KEY_LEN) as usize;
    pool.bytes(EntryHeader::key_offset(at), len)
}

/// Overwrites only the expiry of the entry at `at`
pub fn write_expires(pool: &mut SlabPool, at: u32, expires_at: u64) {
    pool.write_u64(at + EXPIRES, expires_at);
}

pub fn is_expired(expires_at: u64, now: u64) -> bool {
    expires_at != 0 && now >= expires_at
}

/// Absolute expiry for a TTL starting at `now`; a zero TTL never expires.
///
/// Sub-millisecond TTLs round up to one millisecond.
pub fn deadline(now: u64, ttl: Duration) -> u64 {
    if ttl.is_zero() {
        0
    } else {
        let ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        now.saturating_add(ms.max(1))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::slab::PAGE_SIZE;

    fn sample() -> EntryHeader {
        EntryHeader {
            flags: 0xabcd,
            expires_at: 5_000,
            hash: 0x0123_4567_89ab_cdef,
            key_len: 3,
            value_len: 8,
            kind: 2,
        }
    }

    #[test]
    fn test_header_write_read() {
        let mut pool = SlabPool::new(2 * PAGE_SIZE).unwrap();
        let slot = pool.allocate(HEADER_LEN + 11).unwrap();
        pool.write_u32(slot.offset() + LRU_PREV, 77);

        sample().write(&mut pool, slot.offset());

        assert_eq!(EntryHeader::read(&pool, slot.offset()), sample());
        // Links are not part of the header
        assert_eq!(pool.read_u32(slot.offset() + LRU_PREV), 77);
    }

    #[test]
    fn test_key_of() {
        let mut pool = SlabPool::new(2 * PAGE_SIZE).unwrap();
        let at = pool.allocate(HEADER_LEN + 11).unwrap().offset();
        sample().write(&mut pool, at);
        pool.bytes_mut(EntryHeader::key_offset(at), 3)
            .copy_from_slice(b"cat");

        assert_eq!(key_of(&pool, at), b"cat");
    }

    #[test]
    fn test_offsets() {
        let header = sample();
        assert_eq!(EntryHeader::key_offset(64), 64 + 48);
        assert_eq!(header.value_offset(64), 64 + 48 + 3);
        assert_eq!(header.record_len(), 48 + 3 + 8);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let header = sample();
        assert!(!header.is_expired(4_999));
        assert!(header.is_expired(5_000), "Entry should be expired at boundary");
    }

    #[test]
    fn test_never_expires() {
        let header = EntryHeader {
            expires_at: 0,
            ..sample()
        };
        assert!(!header.is_expired(u64::MAX));
        assert!(header.ttl_remaining_ms(10).is_none());
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let header = sample();
        assert_eq!(header.ttl_remaining_ms(1_000), Some(4_000));
        assert_eq!(header.ttl_remaining_ms(9_000), Some(0));
    }

    #[test]
    fn test_deadline() {
        assert_eq!(deadline(100, Duration::ZERO), 0);
        assert_eq!(deadline(100, Duration::from_millis(250)), 350);
        assert_eq!(deadline(100, Duration::from_micros(10)), 101);
        assert_eq!(deadline(u64::MAX - 1, Duration::from_secs(1)), u64::MAX);
    }

    #[test]
    fn test_write_expires() {
        let mut pool = SlabPool::new(2 * PAGE_SIZE).unwrap();
        let slot = pool.allocate(HEADER_LEN).unwrap();
        sample().write(&mut pool, slot.offset());

        write_expires(&mut pool, slot.offset(), 1);

        assert_eq!(EntryHeader::read(&pool, slot.offset()).expires_at, 1);
    }

    #[test]
    fn test_current_timestamp_is_recent() {
        // 2020-01-01 in Unix milliseconds
        assert!(current_timestamp_ms() > 1_577_836_800_000);
    }
}
