//! CSV ingestion for the news headline feed and daily price bars
//!
//! Both loaders coerce types, normalize tickers and dates, and drop rows that
//! cannot take part in the analysis. Timestamps that carry a UTC offset are
//! converted into the exchange timezone before the time of day is discarded,
//! so headline dates line up with the trading calendar.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use super::validation::validate_ticker;
use super::{DataError, DataResult, Headline, PriceBar, Stage};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const TICKER_COLUMNS: &[&str] = &["ticker", "stock", "symbol", "company"];

/// Cell values read as missing, compared case-insensitively
const NA_TOKENS: &[&str] = &[
    "nan", "-nan", "na", "n/a", "#n/a", "#n/a n/a", "#na", "<na>", "null", "none",
    "-1.#ind", "1.#ind", "-1.#qnan", "1.#qnan",
];

/// Parse a timestamp into exchange-local time.
///
/// Offset-aware values are converted into `tz`; naive values are assumed to
/// already be exchange-local. Bare dates map to midnight.
pub fn parse_local_timestamp(raw: &str, tz: Tz) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&tz).naive_local());
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&tz).naive_local());
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Uppercase and trim a ticker; only blank values are rejected
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return None;
    }
    if let Err(reason) = validate_ticker(&ticker) {
        debug!("Unusual ticker kept: {}", reason);
    }
    Some(ticker)
}

fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim();
        candidates.iter().any(|c| h.eq_ignore_ascii_case(c))
    })
}

fn require_column(headers: &StringRecord, name: &str, source_name: &str) -> DataResult<usize> {
    find_column(headers, &[name]).ok_or_else(|| DataError::missing_column(name, source_name))
}

fn is_na(value: &str) -> bool {
    NA_TOKENS.iter().any(|t| value.eq_ignore_ascii_case(t))
}

fn cell<'r>(record: &'r StringRecord, idx: usize) -> Option<&'r str> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|v| !v.is_empty() && !is_na(v))
}

fn parse_number(record: &StringRecord, idx: usize, field: &str, row: usize) -> DataResult<Option<f64>> {
    match cell(record, idx) {
        None => Ok(None),
        Some(raw) => raw
            .replace(',', "")
            .parse::<f64>()
            .map(|v| Some(v).filter(|v| v.is_finite()))
            .map_err(|_| DataError::InvalidValue {
                stage: Stage::Ingestion,
                row,
                field: field.to_string(),
                value: raw.to_string(),
            }),
    }
}

fn parse_date_cell(record: &StringRecord, idx: usize, row: usize, tz: Tz) -> DataResult<Option<NaiveDateTime>> {
    match cell(record, idx) {
        None => Ok(None),
        Some(raw) => parse_local_timestamp(raw, tz)
            .map(Some)
            .ok_or_else(|| DataError::InvalidDate {
                stage: Stage::Ingestion,
                row,
                value: raw.to_string(),
            }),
    }
}

fn source_label(path: &Path) -> String {
    path.display().to_string()
}

/// Load the analyst-ratings headline CSV
pub fn load_headlines<P: AsRef<Path>>(path: P, tz: Tz) -> DataResult<Vec<Headline>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_headlines(file, &source_label(path), tz)
}

/// Read headlines from any CSV source.
///
/// Requires `headline`, `date` and `stock` columns; `publisher` is optional.
pub fn read_headlines<R: Read>(reader: R, source_name: &str, tz: Tz) -> DataResult<Vec<Headline>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let headline_idx = require_column(&headers, "headline", source_name)?;
    let date_idx = require_column(&headers, "date", source_name)?;
    let ticker_idx = require_column(&headers, "stock", source_name)?;
    let publisher_idx = find_column(&headers, &["publisher"]);

    let mut headlines = Vec::new();
    let mut dropped = 0usize;

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 2;

        let Some(ticker) = cell(&record, ticker_idx).and_then(normalize_ticker) else {
            dropped += 1;
            continue;
        };
        let Some(published_at) = parse_date_cell(&record, date_idx, row, tz)? else {
            dropped += 1;
            continue;
        };

        headlines.push(Headline {
            headline: record.get(headline_idx).unwrap_or_default().trim().to_string(),
            publisher: publisher_idx
                .and_then(|idx| cell(&record, idx))
                .unwrap_or_default()
                .to_string(),
            published_at,
            date: published_at.date(),
            ticker,
        });
    }

    if dropped > 0 {
        warn!(source = source_name, dropped, "Dropped headline rows with missing ticker or date");
    }

    if headlines.is_empty() {
        return Err(DataError::empty_input(Stage::Ingestion, source_name));
    }

    info!(source = source_name, rows = headlines.len(), "Loaded headlines");
    Ok(headlines)
}

/// Load a daily price CSV.
///
/// `default_ticker` is used when the file has no ticker column (single-symbol files).
pub fn load_price_bars<P: AsRef<Path>>(path: P, tz: Tz, default_ticker: Option<&str>) -> DataResult<Vec<PriceBar>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_price_bars(file, &source_label(path), tz, default_ticker)
}

/// Read price bars from any CSV source, sorted by (ticker, date)
pub fn read_price_bars<R: Read>(
    reader: R,
    source_name: &str,
    tz: Tz,
    default_ticker: Option<&str>,
) -> DataResult<Vec<PriceBar>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let date_idx = require_column(&headers, "date", source_name)?;
    let open_idx = require_column(&headers, "open", source_name)?;
    let high_idx = require_column(&headers, "high", source_name)?;
    let low_idx = require_column(&headers, "low", source_name)?;
    let close_idx = require_column(&headers, "close", source_name)?;
    let volume_idx = require_column(&headers, "volume", source_name)?;
    let ticker_idx = find_column(&headers, TICKER_COLUMNS);

    let fallback_ticker = default_ticker.and_then(normalize_ticker);
    if ticker_idx.is_none() && fallback_ticker.is_none() {
        return Err(DataError::missing_column("ticker", source_name));
    }

    let mut bars = Vec::new();
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
    let mut dropped = 0usize;
    let mut duplicates = 0usize;

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 2;

        let ticker = match ticker_idx {
            Some(idx) => cell(&record, idx).and_then(normalize_ticker),
            None => fallback_ticker.clone(),
        };
        let Some(ticker) = ticker else {
            dropped += 1;
            continue;
        };
        let Some(timestamp) = parse_date_cell(&record, date_idx, row, tz)? else {
            dropped += 1;
            continue;
        };
        let Some(close) = parse_number(&record, close_idx, "close", row)? else {
            dropped += 1;
            continue;
        };

        let date = timestamp.date();
        if !seen.insert((ticker.clone(), date)) {
            duplicates += 1;
            continue;
        }

        let volume = parse_number(&record, volume_idx, "volume", row)?.unwrap_or(0.0);
        let bar = PriceBar {
            date,
            open: parse_number(&record, open_idx, "open", row)?.unwrap_or(close),
            high: parse_number(&record, high_idx, "high", row)?.unwrap_or(close),
            low: parse_number(&record, low_idx, "low", row)?.unwrap_or(close),
            close,
            volume: volume.round() as i64,
            ticker,
        };

        if let Err(reason) = super::validation::validate_price_bar(&bar) {
            debug!(ticker = %bar.ticker, date = %bar.date, "Suspicious bar: {}", reason);
        }

        bars.push(bar);
    }

    if dropped > 0 {
        warn!(source = source_name, dropped, "Dropped price rows with missing ticker, date or close");
    }
    if duplicates > 0 {
        warn!(source = source_name, duplicates, "Dropped duplicate (ticker, date) price rows");
    }

    if bars.is_empty() {
        return Err(DataError::empty_input(Stage::Ingestion, source_name));
    }

    bars.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
    info!(source = source_name, rows = bars.len(), "Loaded price bars");
    Ok(bars)
}

/// Load and concatenate a directory of per-ticker price CSVs.
///
/// The uppercased file stem names the ticker unless the file has its own ticker column.
pub fn load_price_directory<P: AsRef<Path>>(dir: P, tz: Tz) -> DataResult<Vec<PriceBar>> {
    let dir = dir.as_ref();
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    paths.sort();

    let mut all_bars = Vec::new();
    for path in &paths {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase());
        let bars = load_price_bars(path, tz, stem.as_deref())?;
        all_bars.extend(bars);
    }

    if all_bars.is_empty() {
        return Err(DataError::empty_input(Stage::Ingestion, source_label(dir)));
    }

    all_bars.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
    info!(files = paths.len(), rows = all_bars.len(), "Combined price files");
    Ok(all_bars)
}

/// Write price bars as a combined CSV (`Date,Open,High,Low,Close,Volume,Ticker`)
pub fn write_price_bars<P: AsRef<Path>>(bars: &[PriceBar], path: P) -> DataResult<()> {
    let mut writer = Writer::from_path(path)?;
    for bar in bars {
        writer.serialize(bar)?;
    }
    writer.flush()?;
    Ok(())
}

/// Date-range and ticker filter applied after ingestion
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub tickers: Option<BTreeSet<String>>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.tickers.is_none()
    }

    /// Inclusive on both ends of the date range
    pub fn accepts(&self, ticker: &str, date: NaiveDate) -> bool {
        if self.start.is_some_and(|start| date < start) {
            return false;
        }
        if self.end.is_some_and(|end| date > end) {
            return false;
        }
        match &self.tickers {
            Some(tickers) => tickers.contains(ticker),
            None => true,
        }
    }

    pub fn apply_headlines(&self, headlines: Vec<Headline>) -> Vec<Headline> {
        if self.is_empty() {
            return headlines;
        }
        headlines
            .into_iter()
            .filter(|h| self.accepts(&h.ticker, h.date))
            .collect()
    }

    pub fn apply_prices(&self, bars: Vec<PriceBar>) -> Vec<PriceBar> {
        if self.is_empty() {
            return bars;
        }
        bars.into_iter()
            .filter(|b| self.accepts(&b.ticker, b.date))
            .collect()
    }
}
