//! Error types for the shared dictionary
//!
//! Provides unified error handling using thiserror. The display strings are
//! the short diagnostics callers of a shared dictionary expect to see.

use thiserror::Error;

// == Dict Error Enum ==
/// Unified error type for dictionary operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DictError {
    /// Key absent, or expired and stale reads not requested
    #[error("not found")]
    NotFound,

    /// Allocation failed and eviction was disallowed or exhausted
    #[error("no memory")]
    NoMemory,

    /// List operation on a value that is not a list
    #[error("value not a list")]
    NotAList,

    /// Increment of a value that is not a number
    #[error("not a number")]
    NotANumber,

    /// `add` on a key that is present and unexpired
    #[error("exists")]
    Exists,

    /// Pop from a list that exists but holds no elements
    #[error("list is empty")]
    EmptyList,

    /// List elements must all be numbers or all be strings
    #[error("list elements must share one type")]
    MixedList,

    #[error("empty key")]
    EmptyKey,

    #[error("key too long")]
    KeyTooLong,

    /// Region size rejected at creation
    #[error("invalid capacity: {0} bytes")]
    InvalidCapacity(usize),

    /// Malformed zone declaration in the configuration
    #[error("invalid zone: {0}")]
    InvalidZone(String),

    /// An unknown type tag was read back from the region
    #[error("corrupted entry at offset {0}")]
    Corrupted(u32),
}

// == Result Type Alias ==
/// Convenience Result type for dictionary operations.
pub type Result<T> = std::result::Result<T, DictError>;
