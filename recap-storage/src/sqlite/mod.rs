//! SQLite-backed [`StatsStore`].
//!
//! One connection behind a mutex, opened at startup and shared by
//! reference. Every row is turned into a typed record right here; nothing
//! past this module sees positional columns.

mod rows;
pub mod schema;

pub use rows::{AttachmentRow, MessageRow, UserRow};

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use recap_core::{
    favourite_emojis, BucketKind, DayBuckets, GlobalStats, IngestError, Leaderboard,
    MentionGraph, MentionGraphEdge, MessageRecord, NotableContent, RankedAttachment,
    RankedMessage, RecapError, RecapResult, StorageError, UserId, UserStats, WordUsageRecord,
    Year, YearAggregates,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::store::StatsStore;

/// Stats store over a single SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema.
    pub fn open(path: impl AsRef<Path>) -> RecapResult<Self> {
        let path = path.as_ref();
        let location = path.display().to_string();
        let conn = Connection::open(path).map_err(|e| StorageError::OpenFailed {
            path: location.clone(),
            reason: e.to_string(),
        })?;
        Self::from_connection(conn, location)
    }

    /// Open a database that must already exist.
    pub fn open_existing(path: impl AsRef<Path>) -> RecapResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StorageError::NotFound {
                what: format!("database {}", path.display()),
            }
            .into());
        }
        Self::open(path)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> RecapResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::OpenFailed {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, location: String) -> RecapResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            location,
        };
        store.init_schema()?;
        tracing::info!(location = %store.location, "Opened stats store");
        Ok(store)
    }

    /// Create any missing tables and indexes.
    pub fn init_schema(&self) -> RecapResult<()> {
        self.conn()?
            .execute_batch(schema::SCHEMA)
            .map_err(query_failed("init_schema"))?;
        Ok(())
    }

    /// Where the database lives (`:memory:` for in-memory stores).
    pub fn location(&self) -> &str {
        &self.location
    }

    pub(crate) fn conn(&self) -> RecapResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RecapError::Storage(StorageError::LockPoisoned))
    }
}

// ============================================================================
// ROW DECODING
// ============================================================================

pub(crate) fn query_failed(operation: &'static str) -> impl Fn(rusqlite::Error) -> RecapError {
    move |e| {
        StorageError::QueryFailed {
            operation: operation.to_string(),
            reason: e.to_string(),
        }
        .into()
    }
}

fn transaction_failed(e: rusqlite::Error) -> RecapError {
    StorageError::TransactionFailed {
        reason: e.to_string(),
    }
    .into()
}

/// Non-negative integer column.
fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

fn message_columns(row: &Row<'_>) -> rusqlite::Result<(String, i64, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn message_record(row: &Row<'_>) -> RecapResult<MessageRecord> {
    let (body, reactions, mentions_raw, timestamp) =
        message_columns(row).map_err(query_failed("read message"))?;

    let total_reactions = u64::try_from(reactions).map_err(|_| IngestError::NegativeReactions {
        timestamp,
        count: reactions,
    })?;

    Ok(MessageRecord {
        body,
        total_reactions,
        mentions_raw,
        timestamp,
    })
}

fn decode<T: serde::de::DeserializeOwned>(what: impl Fn() -> String, raw: &str) -> RecapResult<T> {
    serde_json::from_str(raw).map_err(|e| {
        StorageError::DecodeFailed {
            what: what(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn encode<T: serde::Serialize>(what: &str, value: &T) -> RecapResult<String> {
    serde_json::to_string(value).map_err(|e| {
        StorageError::TransactionFailed {
            reason: format!("failed to encode {}: {}", what, e),
        }
        .into()
    })
}

/// Raw `users` row before the emoji payload is parsed.
struct UserStatsRow {
    stats: UserStats,
    emoji_data: Option<String>,
}

fn user_stats_row(row: &Row<'_>, user: UserId, year: Year) -> rusqlite::Result<UserStatsRow> {
    let most_frequent_time: i64 = row.get(8)?;
    Ok(UserStatsRow {
        stats: UserStats {
            user_id: user,
            year,
            user_nickname: row.get(0)?,
            mentions_received: count(row, 1)?,
            mentions_given: count(row, 2)?,
            reactions_received: count(row, 3)?,
            reactions_given: count(row, 4)?,
            messages_sent: count(row, 5)?,
            attachments_sent: count(row, 6)?,
            attachments_size: count(row, 7)?,
            most_frequent_time: u32::try_from(most_frequent_time)
                .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(8, most_frequent_time))?,
            most_mentioned_given_name: row.get(9)?,
            most_mentioned_received_name: row.get(10)?,
            most_mentioned_given_count: count(row, 11)?,
            most_mentioned_received_count: count(row, 12)?,
            favourite_emojis: Vec::new(),
        },
        emoji_data: row.get(13)?,
    })
}

fn notable_row(row: &Row<'_>) -> rusqlite::Result<NotableContent> {
    let message_id: i64 = row.get(0)?;
    let content: String = row.get(1)?;
    let channel_name: String = row.get(2)?;
    let sender_handle: String = row.get(3)?;
    let total_reactions = count(row, 4)?;
    let attachment: Option<(i64, String)> = match row.get::<_, Option<i64>>(5)? {
        Some(id) => Some((id, row.get(6)?)),
        None => None,
    };

    Ok(match attachment {
        Some((attachment_id, file_name)) => NotableContent::Attachment {
            attachment_id,
            file_name,
            sender_handle,
            related_message_content: content,
            related_channel_name: channel_name,
            total_reactions,
        },
        None => NotableContent::Message {
            message_id,
            content,
            sender_handle,
            channel_name,
            total_reactions,
        },
    })
}

// ============================================================================
// STATS STORE
// ============================================================================

impl StatsStore for SqliteStore {
    fn count_messages(&self, year: Year) -> RecapResult<u64> {
        let conn = self.conn()?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE year = ?1",
                params![year],
                |row| row.get(0),
            )
            .map_err(query_failed("count_messages"))?;
        Ok(n.max(0) as u64)
    }

    fn for_each_message(
        &self,
        year: Year,
        visit: &mut dyn FnMut(MessageRecord) -> RecapResult<()>,
    ) -> RecapResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT content, total_reactions, mentions, timestamp FROM messages \
                 WHERE year = ?1 ORDER BY timestamp ASC, message_id ASC",
            )
            .map_err(query_failed("for_each_message"))?;
        let mut rows = stmt
            .query(params![year])
            .map_err(query_failed("for_each_message"))?;
        while let Some(row) = rows.next().map_err(query_failed("for_each_message"))? {
            visit(message_record(row)?)?;
        }
        Ok(())
    }

    fn replace_year_aggregates(&self, year: Year, aggregates: &YearAggregates) -> RecapResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(transaction_failed)?;

        tx.execute("DELETE FROM word_usage WHERE year = ?1", params![year])
            .map_err(transaction_failed)?;

        for kind in BucketKind::ALL {
            let value = encode(kind.key_name(), aggregates.counters.buckets(kind))?;
            tx.execute(
                "INSERT OR REPLACE INTO static (key, year, value) VALUES (?1, ?2, ?3)",
                params![kind.key_name(), year, value],
            )
            .map_err(transaction_failed)?;
        }

        {
            let mut insert = tx
                .prepare("INSERT OR REPLACE INTO word_usage (word, year, data) VALUES (?1, ?2, ?3)")
                .map_err(transaction_failed)?;
            for (word, record) in &aggregates.word_usage {
                let data = encode("word usage", record)?;
                insert
                    .execute(params![word, year, data])
                    .map_err(transaction_failed)?;
            }
        }

        tx.commit().map_err(transaction_failed)?;
        tracing::info!(
            year,
            words = aggregates.word_usage.len(),
            "Replaced year aggregates"
        );
        Ok(())
    }

    fn load_buckets(&self, kind: BucketKind, year: Year) -> RecapResult<Option<DayBuckets>> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM static WHERE key = ?1 AND year = ?2",
                params![kind.key_name(), year],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_failed("load_buckets"))?;
        raw.map(|raw| decode(|| format!("{} for {}", kind, year), &raw))
            .transpose()
    }

    fn load_word_usage(&self, word: &str, year: Year) -> RecapResult<Option<WordUsageRecord>> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT data FROM word_usage WHERE word = ?1 AND year = ?2",
                params![word, year],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_failed("load_word_usage"))?;
        raw.map(|raw| decode(|| format!("word usage of {:?} for {}", word, year), &raw))
            .transpose()
    }

    fn user_stats(&self, user: UserId, year: Year) -> RecapResult<Option<UserStats>> {
        let row = self
            .conn()?
            .query_row(
                "SELECT user_nickname, mentions_received, mentions_given, reactions_received, \
                 reactions_given, messages_sent, attachments_sent, attachments_size, \
                 most_frequent_time, most_mentioned_given_name, most_mentioned_received_name, \
                 most_mentioned_given_count, most_mentioned_received_count, emoji_data \
                 FROM users WHERE user_id = ?1 AND year = ?2",
                params![user.as_i64(), year],
                |row| user_stats_row(row, user, year),
            )
            .optional()
            .map_err(query_failed("user_stats"))?;

        let Some(UserStatsRow { mut stats, emoji_data }) = row else {
            return Ok(None);
        };
        stats.favourite_emojis = favourite_emojis(emoji_data.as_deref()).map_err(|e| {
            StorageError::DecodeFailed {
                what: format!("emoji data of user {} for {}", user, year),
                reason: e.to_string(),
            }
        })?;
        Ok(Some(stats))
    }

    fn global_stats(&self, year: Year) -> RecapResult<GlobalStats> {
        self.conn()?
            .query_row(
                "SELECT COALESCE(SUM(mentions_received), 0), COALESCE(SUM(reactions_received), 0), \
                 COALESCE(SUM(messages_sent), 0), COALESCE(SUM(attachments_sent), 0), \
                 COALESCE(SUM(attachments_size), 0) FROM users WHERE year = ?1",
                params![year],
                |row| {
                    Ok(GlobalStats {
                        total_mentions: count(row, 0)?,
                        total_reactions: count(row, 1)?,
                        total_messages: count(row, 2)?,
                        total_attachments: count(row, 3)?,
                        total_attachments_size: count(row, 4)?,
                    })
                },
            )
            .map_err(query_failed("global_stats"))
    }

    fn leaderboard(&self, year: Year) -> RecapResult<Leaderboard> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT ROW_NUMBER() OVER (ORDER BY al.like_count DESC, al.attachment_id ASC) AS rank, \
                 al.attachment_id, attachments.file_name, messages.author_name, messages.content, \
                 messages.channel_name, al.like_count \
                 FROM (SELECT attachment_id, COUNT(*) AS like_count FROM likes GROUP BY attachment_id) al \
                 JOIN attachments ON attachments.id = al.attachment_id \
                 LEFT JOIN messages ON attachments.related_message_id = messages.message_id \
                 WHERE attachments.year = ?1 ORDER BY rank",
            )
            .map_err(query_failed("leaderboard attachments"))?;
        let attachments = stmt
            .query_map(params![year], |row| {
                Ok(RankedAttachment {
                    rank: count(row, 0)?,
                    attachment_id: row.get(1)?,
                    file_name: row.get(2)?,
                    sender_handle: row.get(3)?,
                    related_message_content: row.get(4)?,
                    related_channel_name: row.get(5)?,
                    likes: count(row, 6)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(query_failed("leaderboard attachments"))?;

        let mut stmt = conn
            .prepare(
                "SELECT ROW_NUMBER() OVER (ORDER BY ml.like_count DESC, ml.message_id ASC) AS rank, \
                 messages.message_id, messages.content, messages.author_name, messages.channel_name, \
                 ml.like_count \
                 FROM (SELECT message_id, COUNT(*) AS like_count FROM message_likes GROUP BY message_id) ml \
                 JOIN messages ON messages.message_id = ml.message_id \
                 WHERE messages.year = ?1 ORDER BY rank",
            )
            .map_err(query_failed("leaderboard messages"))?;
        let messages = stmt
            .query_map(params![year], |row| {
                Ok(RankedMessage {
                    rank: count(row, 0)?,
                    message_id: row.get(1)?,
                    content: row.get(2)?,
                    sender_handle: row.get(3)?,
                    channel_name: row.get(4)?,
                    likes: count(row, 5)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(query_failed("leaderboard messages"))?;

        Ok(Leaderboard {
            attachments,
            messages,
        })
    }

    fn mention_graph(&self, year: Year) -> RecapResult<MentionGraph> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_name, most_mentioned_given_name, most_mentioned_given_count FROM users \
                 WHERE year = ?1 AND most_mentioned_given_count > 0 ORDER BY user_name, user_id",
            )
            .map_err(query_failed("mention_graph"))?;
        let edges = stmt
            .query_map(params![year], |row| {
                Ok(MentionGraphEdge {
                    from_user: row.get(0)?,
                    to_user: row.get(1)?,
                    count: count(row, 2)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(query_failed("mention_graph"))?;
        Ok(MentionGraph { edges })
    }

    fn notable_content(
        &self,
        year: Year,
        user: UserId,
        limit: u32,
    ) -> RecapResult<Vec<NotableContent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT messages.message_id, messages.content, messages.channel_name, \
                 messages.author_name, messages.total_reactions, attachments.id, attachments.file_name \
                 FROM messages LEFT JOIN attachments ON messages.message_id = attachments.related_message_id \
                 WHERE messages.year = ?1 AND messages.author_id = ?2 \
                 ORDER BY messages.total_reactions DESC, messages.message_id ASC, attachments.id ASC \
                 LIMIT ?3",
            )
            .map_err(query_failed("notable_content"))?;
        let items = stmt
            .query_map(params![year, user.as_i64(), limit], notable_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(query_failed("notable_content"))?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::{AggregateCounters, DayBucketKey};
    use std::collections::BTreeMap;

    const DAY: i64 = 1_735_689_600; // 2025-01-01T00:00:00Z

    fn message(id: i64, timestamp: i64, content: &str, reactions: i64, mentions: &str) -> MessageRow {
        MessageRow {
            message_id: id,
            year: 2025,
            timestamp,
            author_id: 1,
            author_name: "ana".to_string(),
            channel_id: 10,
            channel_name: "general".to_string(),
            content: content.to_string(),
            total_reactions: reactions,
            mentions: mentions.to_string(),
        }
    }

    fn aggregates(words: &[&str]) -> YearAggregates {
        let bucket = DayBucketKey::containing(DAY);
        let mut counters = AggregateCounters::default();
        counters.message_buckets.insert(bucket, words.len() as u64);
        let mut word_usage = BTreeMap::new();
        for word in words {
            let mut record = WordUsageRecord::default();
            record.add(bucket);
            word_usage.insert(word.to_string(), record);
        }
        YearAggregates {
            counters,
            word_usage,
        }
    }

    #[test]
    fn test_messages_stream_in_timestamp_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_message(&message(2, DAY + 50, "second", 0, "[]")).unwrap();
        store.insert_message(&message(1, DAY + 10, "first", 3, "[1]")).unwrap();

        let mut seen = Vec::new();
        store
            .for_each_message(2025, &mut |record| {
                seen.push((record.body, record.total_reactions));
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![("first".to_string(), 3), ("second".to_string(), 0)]);
        assert_eq!(store.count_messages(2025).unwrap(), 2);
        assert_eq!(store.count_messages(2024).unwrap(), 0);
    }

    #[test]
    fn test_negative_reactions_rejected_at_boundary() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_message(&message(1, DAY, "x", -2, "[]")).unwrap();

        let err = store.for_each_message(2025, &mut |_| Ok(())).unwrap_err();
        assert_eq!(
            err,
            RecapError::Ingest(IngestError::NegativeReactions {
                timestamp: DAY,
                count: -2
            })
        );
    }

    #[test]
    fn test_replace_drops_vanished_words() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.replace_year_aggregates(2025, &aggregates(&["hello", "world"])).unwrap();
        store.replace_year_aggregates(2025, &aggregates(&["hello"])).unwrap();

        assert!(store.load_word_usage("hello", 2025).unwrap().is_some());
        assert!(store.load_word_usage("world", 2025).unwrap().is_none());
        let buckets = store.load_buckets(BucketKind::Messages, 2025).unwrap().unwrap();
        assert_eq!(buckets.values().sum::<u64>(), 1);
    }

    #[test]
    fn test_replace_leaves_other_years_alone() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.replace_year_aggregates(2024, &aggregates(&["old"])).unwrap();
        store.replace_year_aggregates(2025, &aggregates(&["new"])).unwrap();

        assert!(store.load_word_usage("old", 2024).unwrap().is_some());
        assert!(store.load_word_usage("old", 2025).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_persisted_row_is_decode_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO static (key, year, value) VALUES ('reaction_buckets', 2025, 'nope')",
                [],
            )
            .unwrap();

        let err = store.load_buckets(BucketKind::Reactions, 2025).unwrap_err();
        assert!(matches!(err, RecapError::Storage(StorageError::DecodeFailed { .. })));
    }

    #[test]
    fn test_missing_user_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.user_stats(UserId::new(5), 2025).unwrap(), None);
        assert_eq!(store.global_stats(2025).unwrap(), GlobalStats::default());
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let err = SqliteStore::open_existing(&path).err().unwrap();
        assert!(matches!(err, RecapError::Storage(StorageError::NotFound { .. })));

        SqliteStore::open(&path).unwrap();
        assert!(SqliteStore::open_existing(&path).is_ok());
    }
}
