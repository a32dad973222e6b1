//! Stored cache entries and their freshness.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A computed value plus the window in which it may be served.
///
/// Entries are never mutated in place: a recomputation after expiry
/// replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    computed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// Create an entry computed at `computed_at` that lives for `ttl`.
    ///
    /// A TTL too large to represent saturates at the maximum instant.
    pub fn new(value: V, computed_at: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|delta| computed_at.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            value,
            computed_at,
            expires_at,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the entry may be served at `now` (strictly before expiry).
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Age of the entry at `now`, zero if `now` is before `computed_at`.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.computed_at).to_std().unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_until_exactly_expiry() {
        let entry = CacheEntry::new(5u64, t0(), Duration::from_secs(60));
        assert!(entry.is_fresh_at(t0()));
        assert!(entry.is_fresh_at(t0() + chrono::Duration::seconds(59)));
        assert!(!entry.is_fresh_at(t0() + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let entry = CacheEntry::new("x", t0(), Duration::ZERO);
        assert!(!entry.is_fresh_at(t0()));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new((), t0(), Duration::MAX);
        assert_eq!(entry.expires_at(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_age() {
        let entry = CacheEntry::new((), t0(), Duration::from_secs(60));
        assert_eq!(entry.age_at(t0() + chrono::Duration::seconds(30)), Duration::from_secs(30));
        assert_eq!(entry.age_at(t0() - chrono::Duration::seconds(5)), Duration::ZERO);
    }
}
