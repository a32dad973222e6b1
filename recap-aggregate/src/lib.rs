//! Recap Aggregate - Offline Yearly Aggregation
//!
//! One linear pass over a year's messages builds per-day message, reaction
//! and mention counters plus a word-usage time series, then publishes them
//! to the store in a single transaction. Reruns replace the year's rows and
//! produce the same bytes.

pub mod config;
pub mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{AggregationPipeline, RunReport, YearAccumulator};
