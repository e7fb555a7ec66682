use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::data::{IndicatorSettings, RecordFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub inputs: InputConfig,
    pub indicators: IndicatorSettings,
    pub filter: FilterConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub news_path: PathBuf,
    pub prices_path: PathBuf,
    pub output_dir: PathBuf,
    /// IANA name of the exchange timezone news timestamps are converted into
    pub exchange_timezone: String,
    /// Ticker for single-symbol price files without a ticker column
    pub default_ticker: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tickers: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Trading days between sentiment and the return it is paired with
    pub sentiment_lag: usize,
    pub top_n: usize,
}

impl Config {
    /// Load configuration from the process environment (and `.env`)
    pub fn load() -> Result<Self> {
        // Load .env file - this sets env vars that aren't already set
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Config {
            inputs: InputConfig {
                news_path: get("NEWS_CSV_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.inputs.news_path),
                prices_path: get("PRICES_CSV_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.inputs.prices_path),
                output_dir: get("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.inputs.output_dir),
                exchange_timezone: get("EXCHANGE_TIMEZONE").unwrap_or(defaults.inputs.exchange_timezone),
                default_ticker: get("DEFAULT_TICKER").map(|t| t.to_uppercase()),
            },
            indicators: IndicatorSettings {
                sma_short: parse_or(&get, "SMA_SHORT_WINDOW", defaults.indicators.sma_short)?,
                sma_long: parse_or(&get, "SMA_LONG_WINDOW", defaults.indicators.sma_long)?,
                rsi_period: parse_or(&get, "RSI_PERIOD", defaults.indicators.rsi_period)?,
                macd_fast: parse_or(&get, "MACD_FAST", defaults.indicators.macd_fast)?,
                macd_slow: parse_or(&get, "MACD_SLOW", defaults.indicators.macd_slow)?,
                macd_signal: parse_or(&get, "MACD_SIGNAL", defaults.indicators.macd_signal)?,
            },
            filter: FilterConfig {
                start_date: parse_opt(&get, "START_DATE")?,
                end_date: parse_opt(&get, "END_DATE")?,
                tickers: get("TICKERS").map(|raw| parse_ticker_list(&raw)),
            },
            analysis: AnalysisConfig {
                sentiment_lag: parse_or(&get, "SENTIMENT_LAG", defaults.analysis.sentiment_lag)?,
                top_n: parse_or(&get, "TOP_N", defaults.analysis.top_n)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no stage could run with
    pub fn validate(&self) -> Result<()> {
        self.timezone()?;

        let ind = &self.indicators;
        for (name, value) in [
            ("SMA_SHORT_WINDOW", ind.sma_short),
            ("SMA_LONG_WINDOW", ind.sma_long),
            ("RSI_PERIOD", ind.rsi_period),
            ("MACD_FAST", ind.macd_fast),
            ("MACD_SLOW", ind.macd_slow),
            ("MACD_SIGNAL", ind.macd_signal),
        ] {
            if value == 0 {
                bail!("{} must be greater than zero", name);
            }
        }
        if ind.macd_fast >= ind.macd_slow {
            bail!(
                "MACD_FAST ({}) must be shorter than MACD_SLOW ({})",
                ind.macd_fast,
                ind.macd_slow
            );
        }

        if let (Some(start), Some(end)) = (self.filter.start_date, self.filter.end_date) {
            if start > end {
                bail!("START_DATE ({}) is after END_DATE ({})", start, end);
            }
        }

        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.inputs
            .exchange_timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid EXCHANGE_TIMEZONE '{}': {}", self.inputs.exchange_timezone, e))
    }

    pub fn record_filter(&self) -> RecordFilter {
        RecordFilter {
            start: self.filter.start_date,
            end: self.filter.end_date,
            tickers: self.filter.tickers.clone(),
        }
    }
}

/// Split a comma-separated ticker list, uppercased, blanks removed
pub fn parse_ticker_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid {} value '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_opt<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse()
                .with_context(|| format!("Invalid {} value '{}'", key, raw))
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: InputConfig {
                news_path: PathBuf::from("data/raw_analyst_ratings.csv"),
                prices_path: PathBuf::from("data/combined_stocks.csv"),
                output_dir: PathBuf::from("output"),
                exchange_timezone: "America/New_York".to_string(),
                default_ticker: None,
            },
            indicators: IndicatorSettings::default(),
            filter: FilterConfig::default(),
            analysis: AnalysisConfig {
                sentiment_lag: 0,
                top_n: 20,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let config = Config::from_lookup(lookup(&[]))?;
        assert_eq!(config.indicators, IndicatorSettings::default());
        assert_eq!(config.analysis.sentiment_lag, 0);
        assert_eq!(config.timezone()?, chrono_tz::America::New_York);
        assert!(config.record_filter().is_empty());
        Ok(())
    }

    #[test]
    fn test_overrides_and_filters() -> Result<()> {
        let config = Config::from_lookup(lookup(&[
            ("RSI_PERIOD", "7"),
            ("TICKERS", "aapl, msft,,"),
            ("START_DATE", "2024-01-01"),
            ("SENTIMENT_LAG", "1"),
            ("DEFAULT_TICKER", "tsla"),
        ]))?;
        assert_eq!(config.indicators.rsi_period, 7);
        assert_eq!(config.analysis.sentiment_lag, 1);
        assert_eq!(config.inputs.default_ticker.as_deref(), Some("TSLA"));
        let tickers = config.filter.tickers.clone().unwrap_or_default();
        assert_eq!(tickers.into_iter().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);
        assert_eq!(config.filter.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        Ok(())
    }

    #[test]
    fn test_invalid_value_names_the_variable() {
        let err = Config::from_lookup(lookup(&[("RSI_PERIOD", "fourteen")])).expect_err("invalid");
        assert!(err.to_string().contains("RSI_PERIOD"));
    }

    #[test]
    fn test_validation_rules() {
        assert!(Config::from_lookup(lookup(&[("SMA_SHORT_WINDOW", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("MACD_FAST", "30")])).is_err());
        assert!(Config::from_lookup(lookup(&[
            ("START_DATE", "2024-02-01"),
            ("END_DATE", "2024-01-01"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[("EXCHANGE_TIMEZONE", "Mars/Olympus")])).is_err());
    }
}
