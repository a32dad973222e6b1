//! UTC day bucketing for time-series counters.
//!
//! Every aggregate in recap is partitioned by the UTC calendar day a record
//! falls in. Unix time has no leap seconds, so day boundaries are plain
//! multiples of [`SECONDS_PER_DAY`].

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of one bucket in seconds.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Earliest and latest day starts representable as an `i64`.
const FIRST_BUCKET: i64 = (i64::MIN / SECONDS_PER_DAY) * SECONDS_PER_DAY;
const LAST_BUCKET: i64 = (i64::MAX / SECONDS_PER_DAY) * SECONDS_PER_DAY;

/// Start of a UTC calendar day, as a Unix timestamp in seconds.
///
/// Serializes as a bare integer (and as a decimal string when used as a JSON
/// object key), so persisted maps look like `{"1735689600": 12}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayBucketKey(i64);

impl DayBucketKey {
    /// Bucket containing `timestamp`.
    ///
    /// The few seconds before the first whole day in `i64` range fall into
    /// that first day.
    pub fn containing(timestamp: i64) -> Self {
        let start = timestamp
            .div_euclid(SECONDS_PER_DAY)
            .checked_mul(SECONDS_PER_DAY)
            .unwrap_or(FIRST_BUCKET);
        Self(start)
    }

    /// Unix timestamp of the bucket start.
    pub fn timestamp(&self) -> i64 {
        self.0
    }

    /// The following day's bucket. The last representable day is its own
    /// successor.
    pub fn next(&self) -> Self {
        Self(self.0.checked_add(SECONDS_PER_DAY).unwrap_or(LAST_BUCKET))
    }

    /// Bucket start as a UTC datetime.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        // Every i64 multiple of a day within chrono's range is representable;
        // out-of-range buckets clamp to the epoch.
        DateTime::<Utc>::from_timestamp(self.0, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// UTC calendar year the bucket belongs to.
    pub fn year(&self) -> i32 {
        self.to_datetime().year()
    }
}

impl fmt::Display for DayBucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Truncate a Unix timestamp to the start of its UTC calendar day.
pub fn bucket_of(timestamp: i64) -> DayBucketKey {
    DayBucketKey::containing(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, s)
            .single()
            .expect("valid date")
            .timestamp()
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let first = bucket_of(i64::MIN);
        assert_eq!(first.timestamp() % SECONDS_PER_DAY, 0);
        assert_eq!(first, bucket_of(FIRST_BUCKET));

        let last = bucket_of(i64::MAX);
        assert_eq!(last.timestamp(), LAST_BUCKET);
        assert_eq!(last.next(), last);
    }

    #[test]
    fn test_midnight_boundary_splits_buckets() {
        let t0 = ts(2025, 1, 1, 23, 59, 59);
        let t1 = ts(2025, 1, 2, 0, 0, 0);

        let b0 = bucket_of(t0);
        let b1 = bucket_of(t1);

        assert_ne!(b0, b1);
        assert_eq!(b1.timestamp() - b0.timestamp(), SECONDS_PER_DAY);
        assert_eq!(b0.timestamp(), ts(2025, 1, 1, 0, 0, 0));
        assert_eq!(b1.timestamp(), t1);
    }

    #[test]
    fn test_bucket_of_midnight_is_identity() {
        let midnight = ts(2024, 2, 29, 0, 0, 0);
        assert_eq!(bucket_of(midnight).timestamp(), midnight);
    }

    #[test]
    fn test_negative_timestamps_floor_to_previous_day() {
        assert_eq!(bucket_of(-1).timestamp(), -SECONDS_PER_DAY);
        assert_eq!(bucket_of(0).timestamp(), 0);
    }

    #[test]
    fn test_year_of_bucket() {
        assert_eq!(bucket_of(ts(2025, 12, 31, 23, 59, 59)).year(), 2025);
        assert_eq!(bucket_of(ts(2026, 1, 1, 0, 0, 0)).year(), 2026);
    }

    #[test]
    fn test_json_map_key_is_decimal_string() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(bucket_of(ts(2025, 1, 1, 8, 0, 0)), 3u64);
        let json = serde_json::to_string(&map).expect("serialize");
        assert_eq!(json, "{\"1735689600\":3}");

        let back: std::collections::BTreeMap<DayBucketKey, u64> =
            serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, map);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Property: a bucket never starts after its timestamp and ends after it.
        #[test]
        fn prop_bucket_contains_timestamp(t in -10_000_000_000i64..10_000_000_000i64) {
            let b = bucket_of(t);
            prop_assert!(b.timestamp() <= t);
            prop_assert!(t < b.next().timestamp());
            prop_assert_eq!(b.timestamp().rem_euclid(SECONDS_PER_DAY), 0);
        }

        /// Property: bucketing is monotonic.
        #[test]
        fn prop_bucket_is_monotonic(a in 0i64..4_000_000_000i64, b in 0i64..4_000_000_000i64) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(bucket_of(lo) <= bucket_of(hi));
        }
    }
}
