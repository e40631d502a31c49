//! Dictionary Statistics Module
//!
//! Tracks lookups, forcible evictions and reclaimed expired entries.

use serde::Serialize;

// == Dict Stats ==
/// Counters maintained by a dictionary since creation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DictStats {
    /// Lookups that returned a live value
    pub hits: u64,
    /// Lookups that found nothing live
    pub misses: u64,
    /// Unexpired entries removed to make room for a write
    pub evictions: u64,
    /// Expired entries whose memory was freed
    pub reclaimed: u64,
}

impl DictStats {
    // == Constructor ==
    /// Creates a new DictStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_reclaimed(&mut self, count: usize) {
        self.reclaimed += count as u64;
    }
}

// == Stats Snapshot ==
/// Point-in-time view of a dictionary, as reported by `stats()`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    #[serde(flatten)]
    pub counters: DictStats,
    pub hit_rate: f64,
    /// Entries held, expired ones not yet reclaimed included
    pub entries: usize,
    pub capacity: usize,
    pub free_space: usize,
    pub free_pages: usize,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = DictStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.reclaimed, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(DictStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = DictStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_eviction_and_reclaim() {
        let mut stats = DictStats::new();
        stats.record_eviction();
        stats.record_eviction();
        stats.record_reclaimed(5);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.reclaimed, 5);
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let snapshot = StatsSnapshot {
            counters: DictStats {
                hits: 1,
                ..DictStats::default()
            },
            hit_rate: 1.0,
            entries: 2,
            capacity: 8192,
            free_space: 100,
            free_pages: 1,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["capacity"], 8192);
        assert_eq!(json["free_pages"], 1);
    }
}
