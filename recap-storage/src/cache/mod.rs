//! In-memory memoizing cache for expensive read queries.
//!
//! Callers wrap a computation in [`TtlCache::get_or_compute`] (or a
//! [`Memoized`] operation) and get back either a fresh stored value or the
//! result of exactly one computation shared by every concurrent caller for
//! the same key.
//!
//! # Keys
//!
//! A [`CacheKey`] is the operation name plus every argument, canonicalized
//! through [`KeyPart`]. An integer id and its decimal string form produce
//! the same key.
//!
//! # Example
//!
//! ```ignore
//! let cache = TtlCache::new(CacheConfig::from_env()?);
//! let totals = cache
//!     .get_or_compute(cache_key!("global_stats"; 2025), Duration::from_secs(86400), || {
//!         load_global_stats(2025)
//!     })
//!     .await?;
//! ```

pub mod clock;
pub mod entry;
pub mod key;
pub mod memoized;
pub mod stats;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{CacheKey, KeyPart};
pub use memoized::Memoized;
pub use stats::CacheStats;
pub use ttl::{CacheConfig, TtlCache, DEFAULT_COMPUTE_TIMEOUT};
