//! Data pipeline module for loading headlines and prices, scoring sentiment
//! and computing technical indicators

pub mod errors;
pub mod indicators;
pub mod ingest;
pub mod sentiment;

// Re-export commonly used types
pub use errors::{DataError, DataResult, ErrorKind, Stage};
pub use indicators::{compute_indicators, IndicatorRow, IndicatorSettings, TrendSignal};
pub use ingest::{load_headlines, load_price_bars, load_price_directory, RecordFilter};
pub use sentiment::{LexiconScorer, PolarityScorer};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// News headline as ingested from the analyst ratings feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub headline: String,
    pub publisher: String,
    /// Publication time in the exchange timezone
    pub published_at: NaiveDateTime,
    pub date: NaiveDate,
    pub ticker: String,
}

/// Daily OHLCV bar for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: i64,
    #[serde(rename = "Ticker")]
    pub ticker: String,
}

impl Headline {
    /// Build a headline dated at midnight of `date`
    pub fn on_date(ticker: &str, date: NaiveDate, text: &str) -> Self {
        Self {
            headline: text.to_string(),
            publisher: String::new(),
            published_at: date.and_time(chrono::NaiveTime::MIN),
            date,
            ticker: ticker.to_uppercase(),
        }
    }
}

impl PriceBar {
    /// Build a flat bar where every price equals `close`
    pub fn from_close(ticker: &str, date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
            ticker: ticker.to_uppercase(),
        }
    }
}

/// Validation helpers
pub mod validation {
    use super::*;

    /// Validate a normalized ticker symbol (letters and digits, with `.` or `-` class separators)
    pub fn validate_ticker(ticker: &str) -> Result<(), String> {
        if ticker.is_empty() {
            return Err("ticker cannot be empty".to_string());
        }

        if ticker.len() > 10 {
            return Err(format!("ticker '{}' too long (max 10 chars)", ticker));
        }

        if !ticker
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
        {
            return Err(format!("ticker '{}' contains invalid characters", ticker));
        }

        Ok(())
    }

    /// Check the OHLC relationship of a bar
    pub fn validate_price_bar(bar: &PriceBar) -> Result<(), String> {
        if bar.close <= 0.0 {
            return Err("close price must be positive".to_string());
        }

        if bar.volume < 0 {
            return Err("volume cannot be negative".to_string());
        }

        if bar.high < bar.low {
            return Err("high price cannot be less than low price".to_string());
        }

        if bar.high < bar.open.max(bar.close) || bar.low > bar.open.min(bar.close) {
            return Err("open/close outside the high-low range".to_string());
        }

        Ok(())
    }

    /// Polarity scores live in [-1.0, 1.0]
    pub fn validate_sentiment_score(score: f64) -> bool {
        (-1.0..=1.0).contains(&score)
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::*;

    #[test]
    fn test_validate_ticker() {
        assert!(validate_ticker("AAPL").is_ok());
        assert!(validate_ticker("BRK.B").is_ok());
        assert!(validate_ticker("").is_err());
        assert!(validate_ticker("aapl").is_err());
        assert!(validate_ticker("TOO LONG NAME").is_err());
    }

    #[test]
    fn test_validate_price_bar() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date");
        let mut bar = PriceBar::from_close("AAPL", date, 100.0);
        assert!(validate_price_bar(&bar).is_ok());

        bar.high = 90.0;
        assert!(validate_price_bar(&bar).is_err());
    }

    #[test]
    fn test_sentiment_range() {
        assert!(validate_sentiment_score(0.0));
        assert!(validate_sentiment_score(-1.0));
        assert!(!validate_sentiment_score(1.01));
    }
}
