//! Recap Storage - Stats Store, SQLite Backend and Memoizing Cache
//!
//! - [`StatsStore`]: the blocking read/write contract used by the
//!   aggregation pipeline and the serving queries
//! - [`SqliteStore`]: the SQLite implementation
//! - [`cache`]: TTL memoization with per-key singleflight
//! - [`CachedStatsClient`]: serving queries wrapped in the cache

pub mod cache;
pub mod cached_store;
pub mod queries;
pub mod sqlite;
pub mod store;

pub use cache::{
    CacheConfig, CacheEntry, CacheKey, CacheStats, Clock, KeyPart, ManualClock, Memoized,
    SystemClock, TtlCache,
};
pub use cached_store::{
    CachedStatsClient, GLOBAL_STATS_TTL, LEADERBOARD_TTL, MENTION_GRAPH_TTL, NOTABLE_CONTENT_TTL,
    USER_STATS_TTL,
};
pub use queries::{BlockingStats, StatsQueries};
pub use sqlite::{AttachmentRow, MessageRow, SqliteStore, UserRow};
pub use store::{StatsStore, DEFAULT_NOTABLE_LIMIT};
