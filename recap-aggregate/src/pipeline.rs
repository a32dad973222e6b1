//! Single-pass yearly aggregation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use recap_core::{
    tokens, BucketKind, IngestError, MessageRecord, RecapResult, Year, YearAggregates,
};
use recap_storage::StatsStore;

use crate::config::PipelineConfig;

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// In-memory state of one aggregation pass.
///
/// Every message adds to its day's three counters, creating the bucket
/// with zero if needed, so a day with messages but no reactions still
/// shows up in the reaction map.
#[derive(Debug, Default)]
pub struct YearAccumulator {
    aggregates: YearAggregates,
    messages: u64,
    total_reactions: u64,
    total_mentions: u64,
}

impl YearAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one message into the counters and the word index.
    ///
    /// A malformed mention payload leaves the accumulator unchanged.
    pub fn add(&mut self, record: &MessageRecord) -> Result<(), IngestError> {
        let mentions = record.mention_count()?;
        let bucket = record.bucket();

        let counters = &mut self.aggregates.counters;
        *counters.buckets_mut(BucketKind::Messages).entry(bucket).or_insert(0) += 1;
        *counters.buckets_mut(BucketKind::Reactions).entry(bucket).or_insert(0) +=
            record.total_reactions;
        *counters.buckets_mut(BucketKind::Mentions).entry(bucket).or_insert(0) += mentions;

        for word in tokens(&record.body) {
            self.aggregates.word_usage.entry(word).or_default().add(bucket);
        }

        self.messages += 1;
        self.total_reactions += record.total_reactions;
        self.total_mentions += mentions;
        Ok(())
    }

    pub fn messages(&self) -> u64 {
        self.messages
    }

    pub fn aggregates(&self) -> &YearAggregates {
        &self.aggregates
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub year: Year,
    pub messages: u64,
    pub distinct_words: usize,
    pub total_reactions: u64,
    pub total_mentions: u64,
    pub elapsed: Duration,
}

/// Streams a year of messages out of the store and publishes the day
/// buckets and word index back into it.
pub struct AggregationPipeline {
    store: Arc<dyn StatsStore>,
    config: PipelineConfig,
}

impl AggregationPipeline {
    pub fn new(store: Arc<dyn StatsStore>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Build the aggregates for `year` without persisting them.
    pub fn aggregate(&self, year: Year) -> RecapResult<YearAccumulator> {
        let total = self.store.count_messages(year)?;
        let every = self.config.progress_interval.max(1) as u64;
        tracing::info!(year, total, "Aggregating messages");

        let mut acc = YearAccumulator::new();
        self.store.for_each_message(year, &mut |record| {
            acc.add(&record)?;
            let processed = acc.messages();
            if (processed - 1) % every == 0 {
                tracing::info!(year, processed, total, "Aggregation progress");
            }
            Ok(())
        })?;

        Ok(acc)
    }

    /// Aggregate `year` and replace its persisted aggregates.
    ///
    /// Any failure, including a single malformed record, happens before the
    /// write, so the year's previous rows stay as they were.
    pub fn run(&self, year: Year) -> RecapResult<RunReport> {
        let started = Instant::now();
        let acc = self.aggregate(year)?;
        self.store.replace_year_aggregates(year, &acc.aggregates)?;

        let report = RunReport {
            year,
            messages: acc.messages,
            distinct_words: acc.aggregates.word_usage.len(),
            total_reactions: acc.total_reactions,
            total_mentions: acc.total_mentions,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            year,
            messages = report.messages,
            distinct_words = report.distinct_words,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Aggregation complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use recap_core::DayBucketKey;
    use recap_test_utils::assertions::assert_word_totals_consistent;
    use recap_test_utils::generators::{arb_body, arb_timestamp_in};

    fn record(timestamp: i64, body: &str, reactions: u64, mentions: &str) -> MessageRecord {
        MessageRecord {
            body: body.to_string(),
            total_reactions: reactions,
            mentions_raw: mentions.to_string(),
            timestamp,
        }
    }

    #[test]
    fn test_add_fills_all_three_counters() {
        let mut acc = YearAccumulator::new();
        acc.add(&record(1_735_725_600, "Hello world", 0, "[]")).unwrap();

        let day = DayBucketKey::containing(1_735_725_600);
        let counters = &acc.aggregates().counters;
        assert_eq!(counters.message_buckets.get(&day), Some(&1));
        assert_eq!(counters.reaction_buckets.get(&day), Some(&0));
        assert_eq!(counters.mention_buckets.get(&day), Some(&0));
    }

    #[test]
    fn test_repeated_word_counts_each_occurrence() {
        let mut acc = YearAccumulator::new();
        acc.add(&record(1_735_725_600, "la la\nLA", 0, "[]")).unwrap();

        let usage = &acc.aggregates().word_usage["la"];
        assert_eq!(usage.total, 3);
        assert_eq!(acc.aggregates().word_usage.len(), 1);
    }

    #[test]
    fn test_malformed_mentions_leave_accumulator_untouched() {
        let mut acc = YearAccumulator::new();
        acc.add(&record(1_735_725_600, "first", 1, "[1]")).unwrap();

        let err = acc.add(&record(1_735_725_700, "second", 5, "{oops")).unwrap_err();
        assert!(matches!(err, IngestError::MalformedMentions { timestamp: 1_735_725_700, .. }));
        assert_eq!(acc.messages(), 1);
        assert!(!acc.aggregates().word_usage.contains_key("second"));
        assert_eq!(acc.aggregates().counters.total(BucketKind::Reactions), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: every word total equals the sum of its buckets, and
        /// word totals add up to the number of tokens seen.
        #[test]
        fn prop_word_totals_match_token_count(
            messages in prop::collection::vec((arb_timestamp_in(2025), arb_body()), 0..30)
        ) {
            let mut acc = YearAccumulator::new();
            let mut token_count = 0u64;
            for (timestamp, body) in &messages {
                token_count += tokens(body).count() as u64;
                acc.add(&record(*timestamp, body, 0, "[]")).unwrap();
            }

            assert_word_totals_consistent(acc.aggregates());
            let word_total: u64 = acc.aggregates().word_usage.values().map(|u| u.total).sum();
            prop_assert_eq!(word_total, token_count);
            prop_assert_eq!(
                acc.aggregates().counters.total(BucketKind::Messages),
                messages.len() as u64
            );
        }
    }
}
