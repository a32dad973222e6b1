//! Recap Test Utilities
//!
//! Shared test infrastructure for the recap workspace:
//! - Proptest generators for message rows and text
//! - Fixtures that build small, realistic SQLite databases
//! - Custom assertions for recap-specific error shapes

pub use recap_core::{
    BucketKind, CacheError, DayBucketKey, IngestError, RecapError, RecapResult, StorageError,
    UserId, WordUsageRecord, Year, YearAggregates,
};
pub use recap_storage::{AttachmentRow, MessageRow, SqliteStore, StatsStore, UserRow};

use chrono::{TimeZone, Utc};

/// Unix timestamp of a UTC wall-clock time.
pub fn ts(year: Year, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| panic!("invalid fixture time {year}-{month}-{day} {hour}:{minute}:{second}"))
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for source rows.

    use super::*;
    use proptest::prelude::*;

    /// Generate a timestamp inside `year`.
    pub fn arb_timestamp_in(year: Year) -> impl Strategy<Value = i64> {
        ts(year, 1, 1, 0, 0, 0)..ts(year + 1, 1, 1, 0, 0, 0)
    }

    /// Generate a single word, mixed case, no separators.
    pub fn arb_word() -> impl Strategy<Value = String> {
        "[A-Za-z0-9!?.]{1,8}"
    }

    /// Generate a message body: words joined by spaces and newlines,
    /// including runs of separators.
    pub fn arb_body() -> impl Strategy<Value = String> {
        prop::collection::vec((arb_word(), prop_oneof![Just(" "), Just("\n"), Just("  ")]), 0..12)
            .prop_map(|parts| {
                parts
                    .into_iter()
                    .map(|(word, sep)| format!("{word}{sep}"))
                    .collect()
            })
    }

    /// Generate a well-formed mention payload (JSON array of user ids).
    pub fn arb_mentions_raw() -> impl Strategy<Value = String> {
        prop::collection::vec(1i64..10_000, 0..5)
            .prop_map(|ids| serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Generate up to `max` message rows for `year` with distinct ids.
    pub fn arb_message_rows(year: Year, max: usize) -> impl Strategy<Value = Vec<MessageRow>> {
        prop::collection::vec(
            (arb_timestamp_in(year), arb_body(), 0i64..50, arb_mentions_raw()),
            0..max,
        )
        .prop_map(move |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (timestamp, content, total_reactions, mentions))| MessageRow {
                    message_id: i as i64 + 1,
                    year,
                    timestamp,
                    content,
                    total_reactions,
                    mentions,
                    ..fixtures::message(0, year, 0, "")
                })
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built rows and databases for common scenarios.

    use super::*;

    /// A plain message by user 1 in #general with no reactions or mentions.
    pub fn message(message_id: i64, year: Year, timestamp: i64, content: &str) -> MessageRow {
        MessageRow {
            message_id,
            year,
            timestamp,
            author_id: 1,
            author_name: "ana".to_string(),
            channel_id: 100,
            channel_name: "general".to_string(),
            content: content.to_string(),
            total_reactions: 0,
            mentions: "[]".to_string(),
        }
    }

    /// A user row with zeroed counters.
    pub fn user(user_id: i64, year: Year, name: &str) -> UserRow {
        UserRow {
            user_id,
            year,
            user_name: name.to_string(),
            user_nickname: name.to_uppercase(),
            ..Default::default()
        }
    }

    /// An attachment hanging off `message_id`.
    pub fn attachment(id: i64, year: Year, message_id: i64, file_name: &str) -> AttachmentRow {
        AttachmentRow {
            id,
            year,
            file_name: file_name.to_string(),
            extension: file_name.rsplit('.').next().unwrap_or_default().to_string(),
            timestamp: ts(year, 1, 1, 0, 0, 0),
            related_message_id: Some(message_id),
        }
    }

    /// Fresh in-memory store with the schema in place.
    pub fn empty_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("in-memory store")
    }

    /// Insert every row, panicking on failure.
    pub fn seed_messages(store: &SqliteStore, rows: &[MessageRow]) {
        for row in rows {
            store.insert_message(row).expect("insert message");
        }
    }

    /// Messages for 2025 spanning a UTC midnight, plus one 2024 message.
    ///
    /// - 2025-01-01 10:00 "Hello world" (2 reactions, 1 mention)
    /// - 2025-01-01 23:59:59 "hello\nagain" (1 reaction, 2 mentions)
    /// - 2025-01-02 00:00:00 "World  peace" (0 reactions, 0 mentions)
    /// - 2024-06-01 12:00 "old news"
    pub fn new_year_messages() -> Vec<MessageRow> {
        vec![
            MessageRow {
                total_reactions: 2,
                mentions: "[42]".to_string(),
                ..message(1, 2025, ts(2025, 1, 1, 10, 0, 0), "Hello world")
            },
            MessageRow {
                total_reactions: 1,
                mentions: "[42, 7]".to_string(),
                ..message(2, 2025, ts(2025, 1, 1, 23, 59, 59), "hello\nagain")
            },
            message(3, 2025, ts(2025, 1, 2, 0, 0, 0), "World  peace"),
            message(4, 2024, ts(2024, 6, 1, 12, 0, 0), "old news"),
        ]
    }

    /// Store seeded with [`new_year_messages`].
    pub fn new_year_store() -> SqliteStore {
        let store = empty_store();
        seed_messages(&store, &new_year_messages());
        store
    }

    /// Store with users, attachments and likes for serving queries in 2025.
    ///
    /// - users 1 "ana" (mentions "bo" 4 times) and 2 "bo" (mentions nobody)
    /// - messages 10 (ana, 9 reactions, has attachment 500), 11 (ana, 3
    ///   reactions), 12 (bo, 20 reactions)
    /// - attachment 500 liked by 2 users, message 12 liked by 1, message
    ///   11 liked by 3
    pub fn serving_store() -> SqliteStore {
        let store = empty_store();
        let year = 2025;

        store
            .insert_user(&UserRow {
                mentions_given: 4,
                mentions_received: 1,
                reactions_received: 12,
                messages_sent: 2,
                attachments_sent: 1,
                attachments_size: 2048,
                most_frequent_time: 21,
                most_mentioned_given_name: Some("bo".to_string()),
                most_mentioned_given_count: 4,
                emoji_data: Some(
                    r#"{"123": {"native": false, "animated": true, "inline": 2, "reactions": 1},
                        "😀": {"native": true, "animated": false, "inline": 9, "reactions": 0}}"#
                        .to_string(),
                ),
                ..user(1, year, "ana")
            })
            .expect("insert user");
        store
            .insert_user(&UserRow {
                mentions_received: 4,
                reactions_received: 20,
                messages_sent: 1,
                ..user(2, year, "bo")
            })
            .expect("insert user");

        seed_messages(
            &store,
            &[
                MessageRow {
                    total_reactions: 9,
                    ..message(10, year, ts(year, 3, 1, 9, 0, 0), "look at this")
                },
                MessageRow {
                    total_reactions: 3,
                    ..message(11, year, ts(year, 3, 2, 9, 0, 0), "good morning")
                },
                MessageRow {
                    author_id: 2,
                    author_name: "bo".to_string(),
                    total_reactions: 20,
                    ..message(12, year, ts(year, 3, 3, 9, 0, 0), "big news")
                },
            ],
        );
        store
            .insert_attachment(&attachment(500, year, 10, "cat.png"))
            .expect("insert attachment");

        let at = ts(year, 4, 1, 0, 0, 0);
        for liker in [7, 8] {
            store.like(500, UserId::new(liker), true, at).expect("like");
        }
        store.like(12, UserId::new(7), false, at).expect("like");
        for liker in [7, 8, 9] {
            store.like(11, UserId::new(liker), false, at).expect("like");
        }
        store
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for recap-specific result shapes.

    use super::*;

    /// Assert that a RecapResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &RecapResult<T>) {
        match result {
            Err(RecapError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a RecapResult is a malformed-mentions ingest error.
    #[track_caller]
    pub fn assert_malformed_mentions<T: std::fmt::Debug>(result: &RecapResult<T>) {
        match result {
            Err(RecapError::Ingest(IngestError::MalformedMentions { .. })) => {}
            other => panic!("Expected MalformedMentions error, got: {:?}", other),
        }
    }

    /// Assert that a RecapResult is a cache compute timeout.
    #[track_caller]
    pub fn assert_compute_timeout<T: std::fmt::Debug>(result: &RecapResult<T>) {
        match result {
            Err(RecapError::Cache(CacheError::ComputeTimeout { .. })) => {}
            other => panic!("Expected ComputeTimeout error, got: {:?}", other),
        }
    }

    /// Assert that every word's total equals the sum of its buckets.
    #[track_caller]
    pub fn assert_word_totals_consistent(aggregates: &YearAggregates) {
        for (word, record) in &aggregates.word_usage {
            assert!(
                record.is_consistent(),
                "word {:?} has total {} but buckets sum to {}",
                word,
                record.total,
                record.buckets.values().sum::<u64>()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ts_matches_known_epoch() {
        assert_eq!(ts(2025, 1, 1, 0, 0, 0), 1_735_689_600);
    }

    #[test]
    fn test_serving_store_has_expected_rows() {
        let store = fixtures::serving_store();
        assert_eq!(store.count_messages(2025).unwrap(), 3);
        assert!(store.user_stats(UserId::new(1), 2025).unwrap().is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_rows_stay_in_year(rows in generators::arb_message_rows(2025, 20)) {
            for row in &rows {
                prop_assert_eq!(DayBucketKey::containing(row.timestamp).year(), 2025);
            }
        }

        #[test]
        fn prop_generated_mentions_are_arrays(raw in generators::arb_mentions_raw()) {
            let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
            prop_assert!(value.is_array());
        }
    }
}
