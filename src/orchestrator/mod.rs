//! Orchestrator module for coordinating analysis runs
//! Composes ingestion, scoring, alignment and correlation, then writes the result tables

pub mod pipeline;
pub mod report;

pub use pipeline::{combine_price_files, CorrelationReport, Pipeline};
