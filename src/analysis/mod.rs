//! Analysis stages that consume ingested and scored data:
//! return alignment, correlation, descriptive statistics and text exploration

pub mod alignment;
pub mod correlation;
pub mod descriptive;
pub mod text;
pub mod timeline;

pub use alignment::{align_sentiment_with_prices, calculate_daily_returns, AlignedRecord, DailyReturn};
pub use correlation::{correlate, correlate_by_ticker, pearson, CorrelationSummary};
pub use descriptive::{describe, DescriptiveReport};
