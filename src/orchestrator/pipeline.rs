//! Pipeline orchestrator
//! Coordinates ingestion → sentiment → alignment → correlation and writes the outputs

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::alignment::{align_sentiment_with_prices, AlignedRecord};
use crate::analysis::correlation::{correlate, correlate_by_ticker, CorrelationSummary};
use crate::config::Config;
use crate::data::indicators::{compute_indicators, IndicatorRow};
use crate::data::ingest::{load_headlines, load_price_bars, load_price_directory, write_price_bars};
use crate::data::sentiment::{daily_sentiment, DailySentiment, LexiconScorer, PolarityScorer};
use crate::data::{DataError, DataResult, Headline, PriceBar, Stage};

use super::report::{self, ALIGNED_FILE, DAILY_SENTIMENT_FILE, INDICATORS_FILE};

/// Everything the correlation run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub overall: CorrelationSummary,
    pub per_ticker: Vec<CorrelationSummary>,
    pub aligned: Vec<AlignedRecord>,
    pub daily_sentiment: Vec<DailySentiment>,
}

impl CorrelationReport {
    /// Overall summary first, then one per ticker
    pub fn summaries(&self) -> Vec<CorrelationSummary> {
        std::iter::once(self.overall.clone())
            .chain(self.per_ticker.iter().cloned())
            .collect()
    }

    pub fn display_summary(&self) {
        report::display_correlation(&self.overall, &self.per_ticker);
    }
}

/// Runs the analysis stages against the configured inputs
pub struct Pipeline<S = LexiconScorer> {
    config: Config,
    tz: Tz,
    scorer: S,
}

impl Pipeline<LexiconScorer> {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_scorer(config, LexiconScorer)
    }
}

impl<S: PolarityScorer> Pipeline<S> {
    pub fn with_scorer(config: Config, scorer: S) -> Result<Self> {
        config.validate()?;
        let tz = config.timezone()?;
        info!(timezone = %tz, "Pipeline initialized");
        Ok(Self { config, tz, scorer })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ingest headlines and apply the date/ticker filter
    pub fn load_headlines(&self) -> Result<Vec<Headline>> {
        let path = &self.config.inputs.news_path;
        let headlines = load_headlines(path, self.tz)
            .with_context(|| format!("Failed to load headlines from {}", path.display()))?;

        let filter = self.config.record_filter();
        let before = headlines.len();
        let headlines = filter.apply_headlines(headlines);
        if headlines.is_empty() {
            return Err(DataError::empty_input(Stage::Ingestion, format!("{} (after filters)", path.display())).into());
        }
        if headlines.len() != before {
            info!(kept = headlines.len(), dropped = before - headlines.len(), "Filtered headlines");
        }
        Ok(headlines)
    }

    /// Ingest prices from a combined CSV or a directory of per-ticker CSVs
    pub fn load_prices(&self) -> Result<Vec<PriceBar>> {
        let path = &self.config.inputs.prices_path;
        let bars = if path.is_dir() {
            load_price_directory(path, self.tz)
        } else {
            load_price_bars(path, self.tz, self.config.inputs.default_ticker.as_deref())
        }
        .with_context(|| format!("Failed to load prices from {}", path.display()))?;

        let filter = self.config.record_filter();
        let bars = filter.apply_prices(bars);
        if bars.is_empty() {
            return Err(DataError::empty_input(Stage::Ingestion, format!("{} (after filters)", path.display())).into());
        }
        Ok(bars)
    }

    /// Score headlines and average them per (date, ticker)
    pub fn score(&self, headlines: &[Headline]) -> Vec<DailySentiment> {
        daily_sentiment(headlines, &self.scorer)
    }

    /// Sentiment → alignment → correlation over already ingested tables
    pub fn correlate(&self, headlines: &[Headline], bars: &[PriceBar]) -> DataResult<CorrelationReport> {
        let lag = self.config.analysis.sentiment_lag;
        let daily = self.score(headlines);
        let aligned = align_sentiment_with_prices(&daily, bars, lag)?;
        let overall = correlate(&aligned, lag)?;
        let per_ticker = correlate_by_ticker(&aligned, lag);

        Ok(CorrelationReport {
            overall,
            per_ticker,
            aligned,
            daily_sentiment: daily,
        })
    }

    /// Full run: ingest both sources, correlate, write the aligned table and summaries
    pub fn run_correlation(&self) -> Result<CorrelationReport> {
        info!("Starting sentiment/return correlation run");

        let bars = self.load_prices()?;
        let headlines = self.load_headlines()?;
        let report = self.correlate(&headlines, &bars)?;

        let output_dir = self.output_dir()?;
        report::write_csv(&report.aligned, output_dir.join(ALIGNED_FILE))?;
        report::write_summaries(&report.summaries(), &output_dir)?;

        info!(
            aligned = report.aligned.len(),
            tickers = report.per_ticker.len(),
            "Correlation run complete"
        );
        Ok(report)
    }

    /// Per-bar indicators for every ticker, written to `indicators.csv`
    pub fn run_indicators(&self, bars: &[PriceBar]) -> Result<(Vec<IndicatorRow>, PathBuf)> {
        let rows = compute_indicators(bars, &self.config.indicators);
        let path = self.output_dir()?.join(INDICATORS_FILE);
        report::write_csv(&rows, &path)?;
        Ok((rows, path))
    }

    /// Aggregated daily sentiment, written to `daily_sentiment.csv`
    pub fn run_sentiment(&self) -> Result<(Vec<DailySentiment>, PathBuf)> {
        let headlines = self.load_headlines()?;
        let daily = self.score(&headlines);
        let path = self.output_dir()?.join(DAILY_SENTIMENT_FILE);
        report::write_csv(&daily, &path)?;
        Ok((daily, path))
    }

    fn output_dir(&self) -> Result<PathBuf> {
        let dir = self.config.inputs.output_dir.clone();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(dir)
    }
}

/// Merge a directory of per-ticker price CSVs into one combined CSV
pub fn combine_price_files(input_dir: &Path, output: &Path, tz: Tz) -> Result<usize> {
    let bars = load_price_directory(input_dir, tz)
        .with_context(|| format!("Failed to read price files in {}", input_dir.display()))?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_price_bars(&bars, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(rows = bars.len(), output = %output.display(), "Combined price files");
    Ok(bars.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ErrorKind;
    use chrono::NaiveDate;

    struct FixedScorer(f64);

    impl PolarityScorer for FixedScorer {
        fn polarity(&self, _text: &str) -> f64 {
            self.0
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
    }

    #[test]
    fn test_correlate_requires_two_aligned_rows() -> Result<()> {
        let pipeline = Pipeline::with_scorer(Config::default(), FixedScorer(0.5))?;
        let headlines = vec![Headline::on_date("AAPL", date(3), "anything")];
        let bars = vec![
            PriceBar::from_close("AAPL", date(2), 100.0),
            PriceBar::from_close("AAPL", date(3), 110.0),
        ];
        let err = pipeline.correlate(&headlines, &bars).expect_err("one row");
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        assert_eq!(err.stage(), Some(Stage::Correlation));
        Ok(())
    }

    #[test]
    fn test_report_summaries_lead_with_overall() -> Result<()> {
        let pipeline = Pipeline::new(Config::default())?;
        let headlines = vec![
            Headline::on_date("AAPL", date(3), "Shares surge on record profit"),
            Headline::on_date("AAPL", date(4), "Stock plunges after lawsuit"),
            Headline::on_date("AAPL", date(5), "Analyst upgrade lifts shares"),
        ];
        let bars = vec![
            PriceBar::from_close("AAPL", date(2), 100.0),
            PriceBar::from_close("AAPL", date(3), 104.0),
            PriceBar::from_close("AAPL", date(4), 99.0),
            PriceBar::from_close("AAPL", date(5), 101.0),
        ];
        let report = pipeline.correlate(&headlines, &bars)?;
        assert_eq!(report.aligned.len(), 3);
        let summaries = report.summaries();
        assert_eq!(summaries[0].scope, "ALL");
        assert_eq!(summaries.len(), 1 + report.per_ticker.len());
        assert!(report.overall.coefficient > 0.0);
        Ok(())
    }
}
