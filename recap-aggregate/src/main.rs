//! recap-aggregate entry point
//!
//! Aggregates one year of messages into day buckets and the word index.
//! The year comes from the first argument or `RECAP_YEAR`.

use std::sync::Arc;

use recap_aggregate::{AggregationPipeline, PipelineConfig};
use recap_core::{init_tracing, RecapResult, TelemetryConfig};
use recap_storage::SqliteStore;

fn main() -> RecapResult<()> {
    init_tracing(&TelemetryConfig::from_env("recap-aggregate")?)?;

    let mut config = PipelineConfig::from_env()?;
    if let Some(raw) = std::env::args().nth(1) {
        config = config.with_year(PipelineConfig::parse_year(&raw)?);
    }

    let store = SqliteStore::open_existing(&config.db_path)?;

    let year = config.year;
    let pipeline = AggregationPipeline::new(Arc::new(store), config);
    match pipeline.run(year) {
        Ok(report) => {
            tracing::info!(
                year = report.year,
                messages = report.messages,
                distinct_words = report.distinct_words,
                total_reactions = report.total_reactions,
                total_mentions = report.total_mentions,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Done"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(year, error = %e, "Aggregation failed, nothing written");
            Err(e)
        }
    }
}
