//! Error types for recap operations

use std::time::Duration;
use thiserror::Error;

/// Source-data errors raised while reading records for aggregation.
///
/// Any of these aborts an aggregation run before anything is persisted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Malformed mention payload in message at {timestamp}: {reason}")]
    MalformedMentions { timestamp: i64, reason: String },

    #[error("Negative reaction count {count} in message at {timestamp}")]
    NegativeReactions { timestamp: i64, count: i64 },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Query failed on {operation}: {reason}")]
    QueryFailed { operation: String, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Failed to decode {what}: {reason}")]
    DecodeFailed { what: String, reason: String },

    #[error("Failed to open store at {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Blocking task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Memoizing cache errors.
///
/// Failures of the wrapped computation are not wrapped here; they are
/// delivered to every waiter unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Computation for {key} did not finish within {after:?}")]
    ComputeTimeout { key: String, after: Duration },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all recap errors.
///
/// `Clone` so a single failed computation can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecapError {
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for recap operations.
pub type RecapResult<T> = Result<T, RecapError>;

// =============================================================================
// TESTS
// =============================================================================
