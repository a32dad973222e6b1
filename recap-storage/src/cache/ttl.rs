//! Memoizing TTL cache with per-key singleflight.
//!
//! [`TtlCache::get_or_compute`] answers from a fresh entry when it can.
//! Otherwise exactly one caller (the leader) runs the computation while
//! every other caller for the same key suspends on a `watch` channel and
//! receives the leader's outcome, success or error alike.
//!
//! Per key the lifecycle is `ABSENT -> COMPUTING -> FRESH -> STALE ->
//! COMPUTING -> ...`. Failed computations are never stored, so the next
//! call after a failure starts a fresh computation.
//!
//! All bookkeeping lives behind one `std::sync::Mutex` that is only held
//! inside synchronous helpers, never across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use recap_core::config::env_opt;
use recap_core::{CacheError, ConfigError, RecapError, RecapResult};
use tokio::sync::watch;

use super::clock::{Clock, SystemClock};
use super::entry::CacheEntry;
use super::key::CacheKey;
use super::stats::CacheStats;

/// Default upper bound on a single computation.
pub const DEFAULT_COMPUTE_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for [`TtlCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of stored entries. `None` means unbounded.
    pub max_entries: Option<usize>,
    /// Upper bound on one computation. `None` disables the guard.
    pub compute_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            compute_timeout: Some(DEFAULT_COMPUTE_TIMEOUT),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// - `RECAP_CACHE_MAX_ENTRIES`: capacity bound (unset = unbounded)
    /// - `RECAP_CACHE_COMPUTE_TIMEOUT_SECS`: computation bound in seconds,
    ///   `0` disables it (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(max) = env_opt::<usize>("RECAP_CACHE_MAX_ENTRIES")? {
            config.max_entries = Some(max);
        }
        if let Some(secs) = env_opt::<u64>("RECAP_CACHE_COMPUTE_TIMEOUT_SECS")? {
            config.compute_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    /// Bound the number of stored entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set the computation timeout.
    pub fn with_compute_timeout(mut self, timeout: Duration) -> Self {
        self.compute_timeout = Some(timeout);
        self
    }

    /// Let computations run for as long as they take.
    pub fn without_compute_timeout(mut self) -> Self {
        self.compute_timeout = None;
        self
    }

    /// Reject configurations that could never hold an entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_entries".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1 when set".to_string(),
            });
        }
        if self.compute_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                field: "compute_timeout".to_string(),
                value: "0s".to_string(),
                reason: "use None to disable the timeout".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// CACHE STATE
// ============================================================================

/// What waiters receive: `None` until the leader finishes.
type Outcome<V> = Option<RecapResult<V>>;

/// A computation currently running for one key.
struct InFlight<V> {
    id: u64,
    tx: watch::Sender<Outcome<V>>,
}

struct State<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    in_flight: HashMap<CacheKey, InFlight<V>>,
    next_flight_id: u64,
    stats: CacheStats,
}

/// How a call proceeds after inspecting the state.
enum Lookup<V> {
    Hit(V),
    Wait(watch::Receiver<Outcome<V>>),
    Lead(u64),
}

/// In-memory memoizing cache with expiry and singleflight.
pub struct TtlCache<V> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<State<V>>,
}

impl<V> TtlCache<V> {
    /// Create a cache driven by the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache driven by an explicit clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(State {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                next_flight_id: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // Nothing panics while the lock is held, so a poisoned lock still
    // guards consistent state.
    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop the stored entry for `key`.
    ///
    /// A computation already running for the key is not cancelled; its
    /// result is stored when it completes.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.lock().entries.remove(key).is_some();
        if removed {
            tracing::debug!(key = %key, "Cache entry invalidated");
        }
        removed
    }

    /// Drop every stored entry. Returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        tracing::debug!(dropped, "Cache cleared");
        dropped
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of computations currently running.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len() as u64,
            ..state.stats
        }
    }

    /// Release the in-flight slot of a leader that went away without
    /// finishing. Dropping the sender wakes the waiters, and the first of
    /// them to re-inspect the state becomes the new leader.
    fn abandon(&self, key: &CacheKey, id: u64) {
        let mut state = self.lock();
        if state.in_flight.get(key).is_some_and(|f| f.id == id) {
            state.in_flight.remove(key);
            tracing::debug!(key = %key, "Cache computation abandoned by its caller");
        }
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Fresh value for `key`, if one is stored. Never computes.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        self.lock()
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.value().clone())
    }

    /// Return the cached value for `key` or compute it.
    ///
    /// Concurrent callers for a missing or expired key share a single
    /// invocation of `compute`; all of them receive its result or its
    /// error. Successful results are stored with `expires_at = now + ttl`.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> RecapResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RecapResult<V>>,
    {
        let flight_id = loop {
            match self.lookup(&key) {
                Lookup::Hit(value) => return Ok(value),
                Lookup::Lead(id) => break id,
                Lookup::Wait(rx) => {
                    if let Some(outcome) = self.wait(&key, rx).await {
                        return outcome;
                    }
                }
            }
        };

        let mut flight = Flight {
            cache: self,
            key: &key,
            id: flight_id,
            finished: false,
        };
        let outcome = self.run(&key, compute).await;
        flight.finished = true;
        self.complete(&key, flight_id, &outcome, ttl);
        outcome
    }

    fn lookup(&self, key: &CacheKey) -> Lookup<V> {
        let now = self.clock.now();
        let mut guard = self.lock();
        let state = &mut *guard;

        let fresh = state
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.value().clone());
        if let Some(value) = fresh {
            state.stats.hits += 1;
            tracing::trace!(key = %key, "Cache hit");
            return Lookup::Hit(value);
        }

        state.stats.misses += 1;
        if let Some(flight) = state.in_flight.get(key) {
            state.stats.coalesced += 1;
            return Lookup::Wait(flight.tx.subscribe());
        }

        if state.entries.remove(key).is_some() {
            state.stats.expirations += 1;
        }

        let id = state.next_flight_id;
        state.next_flight_id += 1;
        let (tx, _) = watch::channel(None);
        state.in_flight.insert(key.clone(), InFlight { id, tx });
        state.stats.computations += 1;
        tracing::debug!(key = %key, "Cache miss, computing");
        Lookup::Lead(id)
    }

    /// Wait for the leader's outcome. `None` means the leader went away
    /// and the caller should look again.
    async fn wait(
        &self,
        key: &CacheKey,
        mut rx: watch::Receiver<Outcome<V>>,
    ) -> Option<RecapResult<V>> {
        let finished = rx.wait_for(|outcome| outcome.is_some());
        let received = match self.config.compute_timeout {
            Some(limit) => match tokio::time::timeout(limit, finished).await {
                Ok(received) => received,
                Err(_) => return Some(Err(timeout_error(key, limit))),
            },
            None => finished.await,
        };
        match received {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        }
    }

    async fn run<F, Fut>(&self, key: &CacheKey, compute: F) -> RecapResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RecapResult<V>>,
    {
        let computation = compute();
        match self.config.compute_timeout {
            Some(limit) => match tokio::time::timeout(limit, computation).await {
                Ok(result) => result,
                Err(_) => Err(timeout_error(key, limit)),
            },
            None => computation.await,
        }
    }

    /// Publish the leader's outcome: store it on success, then wake waiters.
    fn complete(&self, key: &CacheKey, id: u64, outcome: &RecapResult<V>, ttl: Duration) {
        let now = self.clock.now();
        let mut guard = self.lock();
        let state = &mut *guard;

        let owns_flight = state.in_flight.get(key).is_some_and(|f| f.id == id);
        let flight = if owns_flight {
            state.in_flight.remove(key)
        } else {
            None
        };

        match outcome {
            Ok(value) => {
                state
                    .entries
                    .insert(key.clone(), CacheEntry::new(value.clone(), now, ttl));
                self.enforce_capacity(state, key);
            }
            Err(error) => {
                state.stats.failures += 1;
                tracing::warn!(key = %key, error = %error, "Cache computation failed");
            }
        }
        drop(guard);

        if let Some(flight) = flight {
            flight.tx.send_replace(Some(outcome.clone()));
        }
    }

    /// Evict earliest-expiring entries until within `max_entries`.
    /// The entry just stored for `keep` is never the victim.
    fn enforce_capacity(&self, state: &mut State<V>, keep: &CacheKey) {
        let Some(max) = self.config.max_entries else {
            return;
        };
        while state.entries.len() > max {
            let victim = state
                .entries
                .iter()
                .filter(|(key, _)| *key != keep)
                .min_by_key(|(_, entry)| entry.expires_at())
                .map(|(key, _)| key.clone());
            let Some(victim) = victim else {
                break;
            };
            state.entries.remove(&victim);
            state.stats.evictions += 1;
            tracing::debug!(key = %victim, max_entries = max, "Cache entry evicted");
        }
    }
}

/// Leader bookkeeping. Releases the in-flight slot if the leader's future
/// is dropped before the computation finishes.
struct Flight<'a, V> {
    cache: &'a TtlCache<V>,
    key: &'a CacheKey,
    id: u64,
    finished: bool,
}

impl<V> Drop for Flight<'_, V> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.abandon(self.key, self.id);
        }
    }
}

fn timeout_error(key: &CacheKey, after: Duration) -> RecapError {
    CacheError::ComputeTimeout {
        key: key.to_string(),
        after,
    }
    .into()
}

// ============================================================================
// TESTS
// ============================================================================
