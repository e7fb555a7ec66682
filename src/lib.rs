// Sentiment Returns - financial news sentiment vs. daily stock returns
// Batch pipeline: ingest headlines and prices, score sentiment, compute indicators,
// align sentiment with returns and test the correlation.

#![deny(clippy::unwrap_used)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod data;
pub mod orchestrator;

// Re-export commonly used items
pub use config::Config;
pub use data::{DataError, DataResult, Headline, PriceBar, Stage};
pub use orchestrator::{CorrelationReport, Pipeline};
