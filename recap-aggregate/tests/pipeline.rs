//! End-to-end aggregation against SQLite.

use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use recap_aggregate::{AggregationPipeline, PipelineConfig};
use recap_test_utils::assertions::assert_malformed_mentions;
use recap_test_utils::fixtures::{message, new_year_messages, new_year_store, seed_messages};
use recap_test_utils::generators::arb_message_rows;
use recap_test_utils::{ts, BucketKind, DayBucketKey, MessageRow, SqliteStore, StatsStore};

fn pipeline(store: Arc<SqliteStore>) -> AggregationPipeline {
    AggregationPipeline::new(store, PipelineConfig::default().with_progress_interval(2))
}

/// Every persisted aggregate row of `year`, exactly as stored.
fn raw_rows(path: &Path, year: i32) -> Vec<(String, String)> {
    let conn = rusqlite::Connection::open(path).unwrap();
    let mut rows = Vec::new();
    for sql in [
        "SELECT key, value FROM static WHERE year = ?1 ORDER BY key",
        "SELECT word, data FROM word_usage WHERE year = ?1 ORDER BY word",
    ] {
        let mut stmt = conn.prepare(sql).unwrap();
        let found = stmt
            .query_map([year], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<Vec<(String, String)>, _>>()
            .unwrap();
        rows.extend(found);
    }
    rows
}

fn on_disk_store(dir: &tempfile::TempDir) -> (Arc<SqliteStore>, std::path::PathBuf) {
    let path = dir.path().join("wrapped.db");
    let store = SqliteStore::open(&path).unwrap();
    seed_messages(&store, &new_year_messages());
    (Arc::new(store), path)
}

#[test]
fn test_buckets_split_at_utc_midnight() {
    let store = Arc::new(new_year_store());
    let report = pipeline(store.clone()).run(2025).unwrap();

    assert_eq!(report.messages, 3);
    assert_eq!(report.total_reactions, 3);
    assert_eq!(report.total_mentions, 3);

    let first = DayBucketKey::containing(ts(2025, 1, 1, 23, 59, 59));
    let second = DayBucketKey::containing(ts(2025, 1, 2, 0, 0, 0));
    assert_eq!(second.timestamp() - first.timestamp(), 86_400);

    let messages = store.load_buckets(BucketKind::Messages, 2025).unwrap().unwrap();
    assert_eq!(messages.get(&first), Some(&2));
    assert_eq!(messages.get(&second), Some(&1));

    let reactions = store.load_buckets(BucketKind::Reactions, 2025).unwrap().unwrap();
    assert_eq!(reactions.get(&first), Some(&3));
    assert_eq!(reactions.get(&second), Some(&0));

    let mentions = store.load_buckets(BucketKind::Mentions, 2025).unwrap().unwrap();
    assert_eq!(mentions.get(&first), Some(&3));
    assert_eq!(mentions.get(&second), Some(&0));
}

#[test]
fn test_word_index_uses_lowercased_tokens() {
    let store = Arc::new(new_year_store());
    let report = pipeline(store.clone()).run(2025).unwrap();
    assert_eq!(report.distinct_words, 4);

    let day1 = DayBucketKey::containing(ts(2025, 1, 1, 0, 0, 0));
    let day2 = day1.next();

    let hello = store.load_word_usage("hello", 2025).unwrap().unwrap();
    assert_eq!(hello.total, 2);
    assert_eq!(hello.buckets.get(&day1), Some(&2));

    let world = store.load_word_usage("world", 2025).unwrap().unwrap();
    assert_eq!(world.total, 2);
    assert_eq!(world.buckets.get(&day1), Some(&1));
    assert_eq!(world.buckets.get(&day2), Some(&1));

    assert!(store.load_word_usage("again", 2025).unwrap().is_some());
    assert!(store.load_word_usage("peace", 2025).unwrap().is_some());
    assert!(store.load_word_usage("old", 2025).unwrap().is_none());
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let (store, path) = on_disk_store(&dir);

    pipeline(store.clone()).run(2025).unwrap();
    let first = raw_rows(&path, 2025);
    pipeline(store).run(2025).unwrap();
    let second = raw_rows(&path, 2025);

    assert_eq!(first.len(), 3 + 4);
    assert_eq!(first, second);
}

#[test]
fn test_malformed_mention_is_fatal_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (store, path) = on_disk_store(&dir);

    pipeline(store.clone()).run(2025).unwrap();
    let before = raw_rows(&path, 2025);

    store
        .insert_message(&MessageRow {
            mentions: "{\"not\": \"an array\"}".to_string(),
            ..message(99, 2025, ts(2025, 6, 1, 8, 0, 0), "brand new words")
        })
        .unwrap();

    let result = pipeline(store.clone()).run(2025);
    assert_malformed_mentions(&result);
    assert_eq!(raw_rows(&path, 2025), before);
    assert!(store.load_word_usage("brand", 2025).unwrap().is_none());
}

#[test]
fn test_empty_year_writes_empty_buckets() {
    let store = Arc::new(new_year_store());
    pipeline(store.clone()).run(2024).unwrap();
    assert!(store.load_word_usage("old", 2024).unwrap().is_some());

    let report = pipeline(store.clone()).run(2031).unwrap();
    assert_eq!(report.messages, 0);
    assert_eq!(report.distinct_words, 0);
    let empty = store.load_buckets(BucketKind::Messages, 2031).unwrap().unwrap();
    assert!(empty.is_empty());

    // Other years keep their rows.
    assert!(store.load_word_usage("old", 2024).unwrap().is_some());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: running twice over the same rows persists the same bytes.
    #[test]
    fn prop_rerun_is_idempotent(rows in arb_message_rows(2025, 25)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrapped.db");
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        seed_messages(&store, &rows);

        let report = pipeline(store.clone()).run(2025).unwrap();
        prop_assert_eq!(report.messages, rows.len() as u64);
        let first = raw_rows(&path, 2025);

        pipeline(store).run(2025).unwrap();
        prop_assert_eq!(first, raw_rows(&path, 2025));
    }
}
