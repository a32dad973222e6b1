//! Recap Core - Domain Types and Pure Utilities
//!
//! Data structures shared by the aggregation pipeline, the stats store and
//! the memoizing cache, plus the two pure functions everything is keyed on:
//! [`bucket_of`] (UTC day bucketing) and [`tokenize`] (word splitting).
//! Nothing here performs I/O.

pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod error;
pub mod identity;
pub mod stats;
pub mod telemetry;
pub mod text;

pub use aggregate::{
    AggregateCounters, BucketKind, DayBuckets, MessageRecord, WordUsageRecord, YearAggregates,
};
pub use bucket::{bucket_of, DayBucketKey, SECONDS_PER_DAY};
pub use error::{CacheError, ConfigError, IngestError, RecapError, RecapResult, StorageError};
pub use identity::{UserId, UserIdParseError, Year};
pub use stats::{
    favourite_emojis, GlobalStats, Leaderboard, LikedAttachment, LikedMessage, MentionGraph,
    MentionGraphEdge, NotableContent, RankedAttachment, RankedMessage, UserEmojiEntry, UserLikes,
    UserStats,
};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use text::{tokenize, tokens};
