//! Read/write contract of the backing stats store.

use recap_core::{
    BucketKind, DayBuckets, GlobalStats, Leaderboard, MentionGraph, MessageRecord,
    NotableContent, RecapResult, UserId, UserStats, WordUsageRecord, Year, YearAggregates,
};

/// Number of notable items returned when the caller does not say.
pub const DEFAULT_NOTABLE_LIMIT: u32 = 20;

/// Blocking storage contract for the aggregation pipeline and the serving
/// queries.
///
/// Implementations own a single store handle that is opened once and shared
/// by reference. All reads and writes are synchronous; async callers go
/// through [`BlockingStats`](crate::BlockingStats).
pub trait StatsStore: Send + Sync {
    // === Pipeline input ===

    /// Number of message records for `year`.
    fn count_messages(&self, year: Year) -> RecapResult<u64>;

    /// Visit every message record for `year` in ascending timestamp order.
    ///
    /// Stops at the first error, from the store or from `visit`.
    fn for_each_message(
        &self,
        year: Year,
        visit: &mut dyn FnMut(MessageRecord) -> RecapResult<()>,
    ) -> RecapResult<()>;

    // === Pipeline output ===

    /// Replace everything persisted for `year` with `aggregates`.
    ///
    /// Writes the three bucket rows and one row per word in one
    /// transaction. Word rows of `year` that are not in `aggregates` are
    /// removed. On error nothing for `year` changes.
    fn replace_year_aggregates(&self, year: Year, aggregates: &YearAggregates) -> RecapResult<()>;

    /// Persisted bucket map of one kind, if the year has been aggregated.
    fn load_buckets(&self, kind: BucketKind, year: Year) -> RecapResult<Option<DayBuckets>>;

    /// Persisted usage record of one word (already lower-cased).
    fn load_word_usage(&self, word: &str, year: Year) -> RecapResult<Option<WordUsageRecord>>;

    // === Serving queries ===

    /// Per-user stats, `None` for a user with no row in `year`.
    fn user_stats(&self, user: UserId, year: Year) -> RecapResult<Option<UserStats>>;

    /// Year-wide totals. A year with no users yields all zeros.
    fn global_stats(&self, year: Year) -> RecapResult<GlobalStats>;

    /// Attachments and messages ranked by like count.
    fn leaderboard(&self, year: Year) -> RecapResult<Leaderboard>;

    /// Who mentioned whom most.
    fn mention_graph(&self, year: Year) -> RecapResult<MentionGraph>;

    /// A user's most-reacted messages and attachments, at most `limit`.
    fn notable_content(
        &self,
        year: Year,
        user: UserId,
        limit: u32,
    ) -> RecapResult<Vec<NotableContent>>;
}
