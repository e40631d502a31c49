//! Expiry Sweep Task
//!
//! Background task that periodically frees expired entries in every zone.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::registry::SharedDicts;

/// Spawns a background task that periodically frees expired entries.
///
/// Every `interval` the task calls `flush_expired(batch)` on each zone in
/// turn, so each dictionary lock is held for one zone's pass only.
///
/// # Arguments
/// * `dicts` - the zones to sweep
/// * `interval` - time between sweeps
/// * `batch` - entries freed per zone per sweep, 0 = all expired
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let dicts = Arc::new(SharedDicts::from_config(&config)?);
/// let sweeper = spawn_sweeper(dicts.clone(), Duration::from_secs(1), 0);
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweeper(dicts: Arc<SharedDicts>, interval: Duration, batch: usize) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            batch,
            zones = dicts.len(),
            "Starting expiry sweeper"
        );

        loop {
            tokio::time::sleep(interval).await;

            for dict in dicts.iter() {
                let freed = dict.flush_expired(batch);
                if freed > 0 {
                    debug!(zone = dict.name(), freed, "Expiry sweep freed entries");
                }
            }
        }
    })
}
