//! A named, TTL-bound memoized operation.

use std::future::Future;
use std::time::Duration;

use recap_core::RecapResult;

use super::key::{CacheKey, KeyPart};
use super::stats::CacheStats;
use super::ttl::TtlCache;

/// One memoized operation: a name, a TTL, a way to turn arguments into
/// key parts, and the cache holding its results.
///
/// ```ignore
/// let stats: Memoized<(UserId, Year), Option<UserStats>> = Memoized::new(
///     "user_stats",
///     Duration::from_secs(3600),
///     |(user, year)| vec![KeyPart::from(*user), KeyPart::from(*year)],
///     TtlCache::new(CacheConfig::default()),
/// );
/// let value = stats.call(&(user, 2025), || fetch(user, 2025)).await?;
/// ```
pub struct Memoized<A: ?Sized, V> {
    operation: &'static str,
    ttl: Duration,
    key_fn: fn(&A) -> Vec<KeyPart>,
    cache: TtlCache<V>,
}

impl<A: ?Sized, V> Memoized<A, V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(
        operation: &'static str,
        ttl: Duration,
        key_fn: fn(&A) -> Vec<KeyPart>,
        cache: TtlCache<V>,
    ) -> Self {
        Self {
            operation,
            ttl,
            key_fn,
            cache,
        }
    }

    /// Cache key for a given argument set.
    pub fn key(&self, args: &A) -> CacheKey {
        CacheKey::new(self.operation, (self.key_fn)(args))
    }

    /// Cached result for `args`, running `compute` on a miss.
    pub async fn call<F, Fut>(&self, args: &A, compute: F) -> RecapResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RecapResult<V>>,
    {
        self.cache
            .get_or_compute(self.key(args), self.ttl, compute)
            .await
    }

    pub fn invalidate(&self, args: &A) -> bool {
        self.cache.invalidate(&self.key(args))
    }

    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_all()
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &TtlCache<V> {
        &self.cache
    }
}
