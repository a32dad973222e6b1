//! Cache counters.

use serde::Serialize;

/// Snapshot of cache activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered from a fresh entry.
    pub hits: u64,
    /// Calls that found no fresh entry (leaders and waiters alike).
    pub misses: u64,
    /// Computations started.
    pub computations: u64,
    /// Computations that returned an error or timed out.
    pub failures: u64,
    /// Calls that waited on another caller's computation.
    pub coalesced: u64,
    /// Entries dropped to stay within `max_entries`.
    pub evictions: u64,
    /// Stale entries superseded on access.
    pub expirations: u64,
    /// Entries currently stored.
    pub entries: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
