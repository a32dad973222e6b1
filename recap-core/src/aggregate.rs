//! Aggregate record types shared by the pipeline and the store.

use crate::{bucket_of, DayBucketKey, IngestError};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Day bucket → count. Ordered so serialized output is deterministic.
pub type DayBuckets = BTreeMap<DayBucketKey, u64>;

/// One message row as consumed by the aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Raw message body.
    pub body: String,
    /// Sum of all reactions on the message.
    pub total_reactions: u64,
    /// JSON-encoded array of mentioned identifiers.
    pub mentions_raw: String,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
}

impl MessageRecord {
    /// Day bucket this message counts toward.
    pub fn bucket(&self) -> DayBucketKey {
        bucket_of(self.timestamp)
    }

    /// Number of mentions in the serialized mention list.
    ///
    /// The payload must be a JSON array; anything else is malformed.
    pub fn mention_count(&self) -> Result<u64, IngestError> {
        serde_json::from_str::<Vec<IgnoredAny>>(&self.mentions_raw)
            .map(|mentions| mentions.len() as u64)
            .map_err(|e| IngestError::MalformedMentions {
                timestamp: self.timestamp,
                reason: e.to_string(),
            })
    }
}

/// Which per-day counter a bucket map holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BucketKind {
    Messages,
    Reactions,
    Mentions,
}

impl BucketKind {
    /// All kinds, in persisted order.
    pub const ALL: [BucketKind; 3] = [
        BucketKind::Messages,
        BucketKind::Reactions,
        BucketKind::Mentions,
    ];

    /// Fixed row key used when persisting this counter.
    pub fn key_name(&self) -> &'static str {
        match self {
            BucketKind::Messages => "message_buckets",
            BucketKind::Reactions => "reaction_buckets",
            BucketKind::Mentions => "mention_buckets",
        }
    }

    /// Parse a persisted row key.
    pub fn from_key_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key_name() == name)
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_name())
    }
}

/// Per-day message, reaction and mention counters for one year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounters {
    pub message_buckets: DayBuckets,
    pub reaction_buckets: DayBuckets,
    pub mention_buckets: DayBuckets,
}

impl AggregateCounters {
    /// The bucket map for one counter.
    pub fn buckets(&self, kind: BucketKind) -> &DayBuckets {
        match kind {
            BucketKind::Messages => &self.message_buckets,
            BucketKind::Reactions => &self.reaction_buckets,
            BucketKind::Mentions => &self.mention_buckets,
        }
    }

    /// Mutable bucket map for one counter.
    pub fn buckets_mut(&mut self, kind: BucketKind) -> &mut DayBuckets {
        match kind {
            BucketKind::Messages => &mut self.message_buckets,
            BucketKind::Reactions => &mut self.reaction_buckets,
            BucketKind::Mentions => &mut self.mention_buckets,
        }
    }

    /// Sum over all buckets of one counter.
    pub fn total(&self, kind: BucketKind) -> u64 {
        self.buckets(kind).values().sum()
    }
}

/// How often one word was used in a year, overall and per day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordUsageRecord {
    pub total: u64,
    pub buckets: DayBuckets,
}

impl WordUsageRecord {
    /// Count one occurrence in `bucket`.
    pub fn add(&mut self, bucket: DayBucketKey) {
        self.total += 1;
        *self.buckets.entry(bucket).or_insert(0) += 1;
    }

    /// `total` equals the sum over all buckets.
    pub fn is_consistent(&self) -> bool {
        self.buckets.values().sum::<u64>() == self.total
    }
}

/// Everything one aggregation run publishes for a year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearAggregates {
    pub counters: AggregateCounters,
    pub word_usage: BTreeMap<String, WordUsageRecord>,
}
