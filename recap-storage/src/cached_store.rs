//! Memoized serving queries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use recap_core::{
    BucketKind, DayBuckets, GlobalStats, Leaderboard, MentionGraph, NotableContent, RecapResult,
    UserId, UserStats, WordUsageRecord, Year,
};

use crate::cache::{CacheConfig, CacheStats, Clock, KeyPart, Memoized, SystemClock, TtlCache};
use crate::queries::{BlockingStats, StatsQueries};
use crate::store::StatsStore;

/// Like counts change as people vote, so rankings refresh every minute.
pub const LEADERBOARD_TTL: Duration = Duration::from_secs(60);
pub const USER_STATS_TTL: Duration = Duration::from_secs(3600);
pub const MENTION_GRAPH_TTL: Duration = Duration::from_secs(3600);
pub const GLOBAL_STATS_TTL: Duration = Duration::from_secs(86400);
pub const NOTABLE_CONTENT_TTL: Duration = Duration::from_secs(86400);

// ============================================================================
// CACHED STATS CLIENT
// ============================================================================

/// Stats client that memoizes the expensive serving queries.
///
/// Exposes the same [`StatsQueries`] interface as the client it wraps.
/// Each operation has its own cache and TTL; concurrent requests for the
/// same arguments share one store query. Bucket and word lookups are plain
/// key reads and pass straight through.
///
/// # Usage
///
/// ```ignore
/// let store: Arc<dyn StatsStore> = Arc::new(SqliteStore::open("wrapped.db")?);
/// let stats = CachedStatsClient::new(store, CacheConfig::from_env()?);
///
/// let board = stats.leaderboard(2025).await?;
/// ```
pub struct CachedStatsClient {
    inner: Arc<dyn StatsQueries>,
    leaderboard: Memoized<Year, Leaderboard>,
    user_stats: Memoized<(UserId, Year), Option<UserStats>>,
    mention_graph: Memoized<Year, MentionGraph>,
    global_stats: Memoized<Year, GlobalStats>,
    notable_content: Memoized<(Year, UserId, u32), Vec<NotableContent>>,
}

fn by_year(year: &Year) -> Vec<KeyPart> {
    vec![KeyPart::from(*year)]
}

fn by_user_and_year(&(user, year): &(UserId, Year)) -> Vec<KeyPart> {
    vec![KeyPart::from(user), KeyPart::from(year)]
}

fn by_year_user_and_limit(&(year, user, limit): &(Year, UserId, u32)) -> Vec<KeyPart> {
    vec![KeyPart::from(year), KeyPart::from(user), KeyPart::from(limit)]
}

fn cache<V>(config: &CacheConfig, clock: &Arc<dyn Clock>) -> TtlCache<V> {
    TtlCache::with_clock(config.clone(), Arc::clone(clock))
}

impl CachedStatsClient {
    /// Cache queries against a blocking store.
    pub fn new(store: Arc<dyn StatsStore>, config: CacheConfig) -> Self {
        Self::wrap(Arc::new(BlockingStats::new(store)), config, Arc::new(SystemClock))
    }

    /// Cache an arbitrary query client with an explicit clock.
    pub fn wrap(inner: Arc<dyn StatsQueries>, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            leaderboard: Memoized::new(
                "leaderboard",
                LEADERBOARD_TTL,
                by_year,
                cache(&config, &clock),
            ),
            user_stats: Memoized::new(
                "user_stats",
                USER_STATS_TTL,
                by_user_and_year,
                cache(&config, &clock),
            ),
            mention_graph: Memoized::new(
                "mention_graph",
                MENTION_GRAPH_TTL,
                by_year,
                cache(&config, &clock),
            ),
            global_stats: Memoized::new(
                "global_stats",
                GLOBAL_STATS_TTL,
                by_year,
                cache(&config, &clock),
            ),
            notable_content: Memoized::new(
                "notable_content",
                NOTABLE_CONTENT_TTL,
                by_year_user_and_limit,
                cache(&config, &clock),
            ),
            inner,
        }
    }

    /// The wrapped, uncached client.
    pub fn inner(&self) -> &Arc<dyn StatsQueries> {
        &self.inner
    }

    /// Counters per memoized operation.
    pub fn cache_stats(&self) -> BTreeMap<&'static str, CacheStats> {
        BTreeMap::from([
            (self.leaderboard.operation(), self.leaderboard.stats()),
            (self.user_stats.operation(), self.user_stats.stats()),
            (self.mention_graph.operation(), self.mention_graph.stats()),
            (self.global_stats.operation(), self.global_stats.stats()),
            (self.notable_content.operation(), self.notable_content.stats()),
        ])
    }

    /// Forget every memoized result, e.g. after the source data is reloaded.
    pub fn invalidate_all(&self) -> usize {
        let dropped = self.leaderboard.invalidate_all()
            + self.user_stats.invalidate_all()
            + self.mention_graph.invalidate_all()
            + self.global_stats.invalidate_all()
            + self.notable_content.invalidate_all();
        tracing::info!(dropped, "Stats caches cleared");
        dropped
    }

    /// Forget the cached leaderboard of `year` so the next read sees new likes.
    pub fn invalidate_leaderboard(&self, year: Year) -> bool {
        self.leaderboard.invalidate(&year)
    }
}

#[async_trait]
impl StatsQueries for CachedStatsClient {
    async fn leaderboard(&self, year: Year) -> RecapResult<Leaderboard> {
        self.leaderboard
            .call(&year, || self.inner.leaderboard(year))
            .await
    }

    async fn user_stats(&self, user: UserId, year: Year) -> RecapResult<Option<UserStats>> {
        self.user_stats
            .call(&(user, year), || self.inner.user_stats(user, year))
            .await
    }

    async fn mention_graph(&self, year: Year) -> RecapResult<MentionGraph> {
        self.mention_graph
            .call(&year, || self.inner.mention_graph(year))
            .await
    }

    async fn global_stats(&self, year: Year) -> RecapResult<GlobalStats> {
        self.global_stats
            .call(&year, || self.inner.global_stats(year))
            .await
    }

    async fn notable_content(
        &self,
        year: Year,
        user: UserId,
        limit: u32,
    ) -> RecapResult<Vec<NotableContent>> {
        self.notable_content
            .call(&(year, user, limit), || {
                self.inner.notable_content(year, user, limit)
            })
            .await
    }

    async fn buckets(&self, kind: BucketKind, year: Year) -> RecapResult<Option<DayBuckets>> {
        self.inner.buckets(kind, year).await
    }

    async fn word_usage(&self, word: &str, year: Year) -> RecapResult<Option<WordUsageRecord>> {
        self.inner.word_usage(word, year).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use recap_core::{RecapError, StorageError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Query client that counts calls and can be told to fail.
    #[derive(Default)]
    struct CountingQueries {
        calls: AtomicUsize,
        fail_with: Mutex<Option<RecapError>>,
    }

    impl CountingQueries {
        fn hit(&self) -> RecapResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatsQueries for CountingQueries {
        async fn leaderboard(&self, _year: Year) -> RecapResult<Leaderboard> {
            self.hit()?;
            Ok(Leaderboard::default())
        }

        async fn user_stats(&self, _user: UserId, _year: Year) -> RecapResult<Option<UserStats>> {
            self.hit()?;
            Ok(None)
        }

        async fn mention_graph(&self, _year: Year) -> RecapResult<MentionGraph> {
            self.hit()?;
            Ok(MentionGraph::default())
        }

        async fn global_stats(&self, year: Year) -> RecapResult<GlobalStats> {
            self.hit()?;
            Ok(GlobalStats {
                total_messages: year as u64,
                ..Default::default()
            })
        }

        async fn notable_content(
            &self,
            _year: Year,
            _user: UserId,
            _limit: u32,
        ) -> RecapResult<Vec<NotableContent>> {
            self.hit()?;
            Ok(Vec::new())
        }

        async fn buckets(&self, _kind: BucketKind, _year: Year) -> RecapResult<Option<DayBuckets>> {
            self.hit()?;
            Ok(None)
        }

        async fn word_usage(&self, _word: &str, _year: Year) -> RecapResult<Option<WordUsageRecord>> {
            self.hit()?;
            Ok(None)
        }
    }

    fn client() -> (CachedStatsClient, Arc<CountingQueries>, Arc<ManualClock>) {
        let queries = Arc::new(CountingQueries::default());
        let clock = Arc::new(ManualClock::default());
        let client = CachedStatsClient::wrap(queries.clone(), CacheConfig::default(), clock.clone());
        (client, queries, clock)
    }

    #[tokio::test]
    async fn test_leaderboard_refreshes_after_a_minute() {
        let (client, queries, clock) = client();

        client.leaderboard(2025).await.unwrap();
        clock.advance(Duration::from_secs(30));
        client.leaderboard(2025).await.unwrap();
        assert_eq!(queries.calls(), 1);

        clock.advance(Duration::from_secs(31));
        client.leaderboard(2025).await.unwrap();
        assert_eq!(queries.calls(), 2);
    }

    #[tokio::test]
    async fn test_global_stats_cached_per_year() {
        let (client, queries, clock) = client();

        assert_eq!(client.global_stats(2024).await.unwrap().total_messages, 2024);
        assert_eq!(client.global_stats(2025).await.unwrap().total_messages, 2025);
        clock.advance(Duration::from_secs(3600));
        assert_eq!(client.global_stats(2025).await.unwrap().total_messages, 2025);
        assert_eq!(queries.calls(), 2);
    }

    #[tokio::test]
    async fn test_parsed_and_numeric_user_ids_share_entry() {
        let (client, queries, _clock) = client();
        let parsed: UserId = "0042".parse().unwrap();

        client.user_stats(UserId::new(42), 2025).await.unwrap();
        client.user_stats(parsed, 2025).await.unwrap();
        assert_eq!(queries.calls(), 1);
        assert_eq!(client.cache_stats()["user_stats"].hits, 1);
    }

    #[tokio::test]
    async fn test_notable_limit_is_part_of_key() {
        let (client, queries, _clock) = client();
        client.notable_content(2025, UserId::new(1), 20).await.unwrap();
        client.notable_content(2025, UserId::new(1), 5).await.unwrap();
        client.notable_content(2025, UserId::new(1), 20).await.unwrap();
        assert_eq!(queries.calls(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let (client, queries, _clock) = client();
        *queries.fail_with.lock().unwrap() = Some(StorageError::LockPoisoned.into());

        assert!(client.mention_graph(2025).await.is_err());
        *queries.fail_with.lock().unwrap() = None;
        assert!(client.mention_graph(2025).await.is_ok());
        assert_eq!(queries.calls(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_reads_pass_through() {
        let (client, queries, _clock) = client();
        client.buckets(BucketKind::Messages, 2025).await.unwrap();
        client.buckets(BucketKind::Messages, 2025).await.unwrap();
        client.word_usage("hello", 2025).await.unwrap();
        assert_eq!(queries.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_reload() {
        let (client, queries, _clock) = client();
        client.global_stats(2025).await.unwrap();
        client.leaderboard(2025).await.unwrap();
        assert_eq!(client.invalidate_all(), 2);
        client.global_stats(2025).await.unwrap();
        assert_eq!(queries.calls(), 3);
        assert!(!client.invalidate_leaderboard(2025));
    }
}
