//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the process is up.
//!
//! # Tasks
//! - Expiry sweep: frees expired entries in every zone at configured intervals

mod sweeper;

pub use sweeper::spawn_sweeper;
