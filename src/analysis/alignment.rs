//! Daily returns and the (date, ticker) join against aggregated sentiment

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use crate::data::indicators::group_by_ticker;
use crate::data::sentiment::DailySentiment;
use crate::data::{DataError, DataResult, PriceBar, Stage};

/// Close-to-close return for one trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    /// `None` for the first bar of a ticker or after a zero close
    pub daily_return: Option<f64>,
}

/// Sentiment and return for one (date, ticker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRecord {
    pub date: NaiveDate,
    pub ticker: String,
    /// Date whose headlines produced `avg_sentiment`; equals `date` without lag
    pub sentiment_date: NaiveDate,
    pub avg_sentiment: f64,
    pub headline_count: usize,
    pub daily_return: f64,
}

/// Percentage change of the close against the previous trading day, per ticker.
///
/// Output is sorted by ticker, then date ascending.
pub fn calculate_daily_returns(bars: &[PriceBar]) -> Vec<DailyReturn> {
    let mut returns = Vec::with_capacity(bars.len());

    for (ticker, series) in group_by_ticker(bars) {
        let mut previous: Option<f64> = None;
        for bar in series {
            let daily_return = match previous {
                Some(prev) if prev != 0.0 => Some((bar.close - prev) / prev),
                _ => None,
            };
            returns.push(DailyReturn {
                date: bar.date,
                ticker: ticker.to_string(),
                close: bar.close,
                daily_return,
            });
            previous = Some(bar.close);
        }
    }

    returns
}

/// Inner-join aggregated sentiment with daily returns on (date, ticker).
///
/// With `lag = k`, the return of trading bar `i` is paired with the sentiment
/// of trading bar `i - k` of the same ticker. Rows missing either side, or
/// without a defined return, are dropped.
pub fn align_sentiment_with_returns(
    sentiment: &[DailySentiment],
    returns: &[DailyReturn],
    lag: usize,
) -> DataResult<Vec<AlignedRecord>> {
    let by_key: HashMap<(&str, NaiveDate), &DailySentiment> = sentiment
        .iter()
        .map(|s| ((s.ticker.as_str(), s.date), s))
        .collect();

    let mut per_ticker: BTreeMap<&str, Vec<&DailyReturn>> = BTreeMap::new();
    for r in returns {
        per_ticker.entry(r.ticker.as_str()).or_default().push(r);
    }

    let mut aligned = Vec::new();
    for (ticker, mut series) in per_ticker {
        series.sort_by_key(|r| r.date);
        for (i, r) in series.iter().enumerate() {
            let Some(daily_return) = r.daily_return else {
                continue;
            };
            if i < lag {
                continue;
            }
            let sentiment_date = series[i - lag].date;
            if let Some(s) = by_key.get(&(ticker, sentiment_date)) {
                aligned.push(AlignedRecord {
                    date: r.date,
                    ticker: ticker.to_string(),
                    sentiment_date,
                    avg_sentiment: s.avg_sentiment,
                    headline_count: s.headline_count,
                    daily_return,
                });
            }
        }
    }

    if aligned.is_empty() {
        warn!(
            sentiment_days = sentiment.len(),
            return_days = returns.len(),
            "No overlapping (date, ticker) keys between sentiment and returns"
        );
        return Err(DataError::insufficient(
            Stage::Alignment,
            0,
            "sentiment and returns share no (date, ticker) keys",
        ));
    }

    aligned.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
    info!(rows = aligned.len(), lag, "Aligned sentiment with returns");
    Ok(aligned)
}

/// Compute returns from bars, then align
pub fn align_sentiment_with_prices(
    sentiment: &[DailySentiment],
    bars: &[PriceBar],
    lag: usize,
) -> DataResult<Vec<AlignedRecord>> {
    let returns = calculate_daily_returns(bars);
    align_sentiment_with_returns(sentiment, &returns, lag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
    }

    fn sentiment(ticker: &str, d: u32, score: f64) -> DailySentiment {
        DailySentiment {
            date: date(d),
            ticker: ticker.to_string(),
            avg_sentiment: score,
            headline_count: 1,
        }
    }

    #[test]
    fn test_first_return_undefined() {
        let bars = vec![
            PriceBar::from_close("AAPL", date(3), 110.0),
            PriceBar::from_close("AAPL", date(2), 100.0),
            PriceBar::from_close("AAPL", date(4), 99.0),
        ];
        let returns = calculate_daily_returns(&bars);
        assert_eq!(returns[0].date, date(2));
        assert_eq!(returns[0].daily_return, None);
        assert!((returns[1].daily_return.unwrap_or_default() - 0.10).abs() < 1e-12);
        assert!((returns[2].daily_return.unwrap_or_default() - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn test_returns_restart_per_ticker() {
        let bars = vec![
            PriceBar::from_close("AAPL", date(2), 100.0),
            PriceBar::from_close("MSFT", date(3), 50.0),
            PriceBar::from_close("AAPL", date(3), 101.0),
        ];
        let returns = calculate_daily_returns(&bars);
        let msft: Vec<_> = returns.iter().filter(|r| r.ticker == "MSFT").collect();
        assert_eq!(msft.len(), 1);
        assert_eq!(msft[0].daily_return, None);
    }

    #[test]
    fn test_zero_close_yields_no_return() {
        let bars = vec![
            PriceBar::from_close("X", date(2), 0.0),
            PriceBar::from_close("X", date(3), 5.0),
        ];
        let returns = calculate_daily_returns(&bars);
        assert_eq!(returns[1].daily_return, None);
    }

    #[test]
    fn test_join_is_exact_on_date_and_ticker() {
        let bars = vec![
            PriceBar::from_close("AAPL", date(2), 100.0),
            PriceBar::from_close("AAPL", date(3), 110.0),
            PriceBar::from_close("AAPL", date(4), 105.0),
        ];
        let daily = vec![
            sentiment("AAPL", 2, 0.8),
            sentiment("AAPL", 3, -0.7),
            sentiment("MSFT", 4, 0.1),
        ];
        let aligned = align_sentiment_with_prices(&daily, &bars, 0).expect("aligned");
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].date, date(3));
        assert_eq!(aligned[0].sentiment_date, date(3));
        assert!((aligned[0].daily_return - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_lagged_join_uses_previous_trading_day() {
        let bars = vec![
            PriceBar::from_close("AAPL", date(2), 100.0),
            PriceBar::from_close("AAPL", date(3), 110.0),
            PriceBar::from_close("AAPL", date(5), 121.0),
        ];
        let daily = vec![sentiment("AAPL", 2, 0.8), sentiment("AAPL", 3, -0.7)];
        let aligned = align_sentiment_with_prices(&daily, &bars, 1).expect("aligned");
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[0].date, date(3));
        assert_eq!(aligned[0].sentiment_date, date(2));
        assert_eq!(aligned[1].date, date(5));
        assert_eq!(aligned[1].sentiment_date, date(3));
        assert_eq!(aligned[1].avg_sentiment, -0.7);
    }

    #[test]
    fn test_lagged_join_with_interleaved_tickers() {
        let returns = vec![
            DailyReturn { date: date(2), ticker: "AAPL".into(), close: 100.0, daily_return: None },
            DailyReturn { date: date(2), ticker: "MSFT".into(), close: 50.0, daily_return: None },
            DailyReturn { date: date(3), ticker: "AAPL".into(), close: 110.0, daily_return: Some(0.1) },
        ];
        let daily = vec![sentiment("AAPL", 2, 0.4)];
        let aligned = align_sentiment_with_returns(&daily, &returns, 1).expect("aligned");
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].date, date(3));
        assert_eq!(aligned[0].sentiment_date, date(2));
        assert!((aligned[0].daily_return - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_no_overlap_is_insufficient() {
        let bars = vec![
            PriceBar::from_close("AAPL", date(2), 100.0),
            PriceBar::from_close("AAPL", date(3), 110.0),
        ];
        let daily = vec![sentiment("AAPL", 9, 0.8)];
        let err = align_sentiment_with_prices(&daily, &bars, 0).expect_err("no overlap");
        assert!(matches!(err, DataError::InsufficientData { stage: Stage::Alignment, .. }));
    }
}
