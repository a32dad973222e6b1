//! Async read seam used by the serving layer.
//!
//! [`StatsQueries`] is what request handlers call. [`BlockingStats`] answers
//! it by running the blocking [`StatsStore`] on tokio's blocking pool, and
//! [`CachedStatsClient`](crate::CachedStatsClient) decorates any
//! implementation with memoization.

use std::sync::Arc;

use async_trait::async_trait;
use recap_core::{
    BucketKind, DayBuckets, GlobalStats, Leaderboard, MentionGraph, NotableContent, RecapResult,
    StorageError, UserId, UserStats, WordUsageRecord, Year,
};

use crate::store::StatsStore;

/// Async read operations over the stats store.
#[async_trait]
pub trait StatsQueries: Send + Sync {
    // ========================================================================
    // SERVING QUERIES
    // ========================================================================

    async fn leaderboard(&self, year: Year) -> RecapResult<Leaderboard>;

    async fn user_stats(&self, user: UserId, year: Year) -> RecapResult<Option<UserStats>>;

    async fn mention_graph(&self, year: Year) -> RecapResult<MentionGraph>;

    async fn global_stats(&self, year: Year) -> RecapResult<GlobalStats>;

    async fn notable_content(
        &self,
        year: Year,
        user: UserId,
        limit: u32,
    ) -> RecapResult<Vec<NotableContent>>;

    // ========================================================================
    // PERSISTED AGGREGATES
    // ========================================================================

    /// Day buckets of one kind written by the aggregation pipeline.
    async fn buckets(&self, kind: BucketKind, year: Year) -> RecapResult<Option<DayBuckets>>;

    /// Usage time series of one word. Matching ignores case.
    async fn word_usage(&self, word: &str, year: Year) -> RecapResult<Option<WordUsageRecord>>;
}

/// [`StatsQueries`] over a blocking store, one `spawn_blocking` per call.
#[derive(Clone)]
pub struct BlockingStats {
    store: Arc<dyn StatsStore>,
}

impl BlockingStats {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn StatsStore> {
        &self.store
    }

    async fn run<T, F>(&self, operation: &'static str, query: F) -> RecapResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StatsStore) -> RecapResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || query(store.as_ref()))
            .await
            .map_err(|e| StorageError::TaskFailed {
                reason: format!("{}: {}", operation, e),
            })?
    }
}

#[async_trait]
impl StatsQueries for BlockingStats {
    async fn leaderboard(&self, year: Year) -> RecapResult<Leaderboard> {
        self.run("leaderboard", move |store| store.leaderboard(year))
            .await
    }

    async fn user_stats(&self, user: UserId, year: Year) -> RecapResult<Option<UserStats>> {
        self.run("user_stats", move |store| store.user_stats(user, year))
            .await
    }

    async fn mention_graph(&self, year: Year) -> RecapResult<MentionGraph> {
        self.run("mention_graph", move |store| store.mention_graph(year))
            .await
    }

    async fn global_stats(&self, year: Year) -> RecapResult<GlobalStats> {
        self.run("global_stats", move |store| store.global_stats(year))
            .await
    }

    async fn notable_content(
        &self,
        year: Year,
        user: UserId,
        limit: u32,
    ) -> RecapResult<Vec<NotableContent>> {
        self.run("notable_content", move |store| {
            store.notable_content(year, user, limit)
        })
        .await
    }

    async fn buckets(&self, kind: BucketKind, year: Year) -> RecapResult<Option<DayBuckets>> {
        self.run("buckets", move |store| store.load_buckets(kind, year))
            .await
    }

    async fn word_usage(&self, word: &str, year: Year) -> RecapResult<Option<WordUsageRecord>> {
        let word = word.to_lowercase();
        self.run("word_usage", move |store| store.load_word_usage(&word, year))
            .await
    }
}
