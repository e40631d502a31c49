//! shdict - Shared bounded-memory dictionaries
//!
//! Named key-value zones living in fixed-size slab regions, with TTL
//! expiration, LRU eviction, atomic counters and lists.

pub mod config;
pub mod console;
pub mod dict;
pub mod error;
pub mod registry;
pub mod slab;
pub mod tasks;

pub use config::Config;
pub use dict::{Scalar, SharedDict, Value};
pub use error::{DictError, Result};
pub use registry::SharedDicts;
pub use tasks::spawn_sweeper;
