//! Dictionary Module
//!
//! Key-value storage inside a fixed slab region, with TTL expiration,
//! LRU eviction, counters and lists.

mod entry;
mod list;
mod lru;
mod shared;
mod stats;
mod store;
mod value;


// Re-export public types
pub use entry::current_timestamp_ms;
pub use list::End;
pub use shared::SharedDict;
pub use stats::{DictStats, StatsSnapshot};
pub use store::{Incremented, Keys, Lookup, Store, Stored, WriteMode};
pub use value::{Scalar, Value, ValueKind};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 65535;

/// Keys returned by a `get_keys` call when the caller gives no limit
pub const DEFAULT_KEYS_LIMIT: usize = 1024;
