//! Technical indicators module
//! Implements SMA, EMA, RSI and MACD as per-bar series over daily closes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::PriceBar;

/// Window lengths for every indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma_short: 20,
            sma_long: 50,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

/// Indicator values for one bar. `None` until the window has filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
}

/// MACD indicator components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MACDSignal {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
    pub trend: String,
}

/// Trend signal enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TrendSignal {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl TrendSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendSignal::StrongBuy => "STRONG_BUY",
            TrendSignal::Buy => "BUY",
            TrendSignal::Neutral => "NEUTRAL",
            TrendSignal::Sell => "SELL",
            TrendSignal::StrongSell => "STRONG_SELL",
        }
    }
}

/// Latest indicator readings for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSignals {
    pub ticker: String,
    pub date: NaiveDate,
    pub rsi: Option<f64>,
    pub macd: Option<MACDSignal>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub signal: TrendSignal,
    pub confidence: f64,
}

/// Close and volume summary for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub ticker: String,
    pub bars: usize,
    pub average_close: f64,
    pub max_close: f64,
    pub min_close: f64,
    /// Sample standard deviation; `None` with fewer than two bars
    pub volume_std: Option<f64>,
}

/// Group bars by ticker, each group sorted by date ascending
pub fn group_by_ticker(bars: &[PriceBar]) -> BTreeMap<&str, Vec<&PriceBar>> {
    let mut groups: BTreeMap<&str, Vec<&PriceBar>> = BTreeMap::new();
    for bar in bars {
        groups.entry(bar.ticker.as_str()).or_default().push(bar);
    }
    for series in groups.values_mut() {
        series.sort_by_key(|b| b.date);
    }
    groups
}

/// Compute all indicator series, independently per ticker
pub fn compute_indicators(bars: &[PriceBar], settings: &IndicatorSettings) -> Vec<IndicatorRow> {
    let mut rows = Vec::with_capacity(bars.len());

    for (ticker, series) in group_by_ticker(bars) {
        let closes: Vec<f64> = series.iter().map(|b| b.close).collect();

        let sma_short = sma_series(&closes, settings.sma_short);
        let sma_long = sma_series(&closes, settings.sma_long);
        let rsi = rsi_series(&closes, settings.rsi_period);
        let (macd, signal, histogram) =
            macd_series(&closes, settings.macd_fast, settings.macd_slow, settings.macd_signal);

        debug!(ticker, bars = closes.len(), "Computed indicator series");

        for (i, bar) in series.iter().enumerate() {
            rows.push(IndicatorRow {
                date: bar.date,
                ticker: ticker.to_string(),
                close: bar.close,
                sma_short: sma_short[i],
                sma_long: sma_long[i],
                rsi: rsi[i],
                macd: macd[i],
                macd_signal: signal[i],
                macd_histogram: histogram[i],
            });
        }
    }

    info!(rows = rows.len(), "Computed technical indicators");
    rows
}

/// Simple moving average; the first `period - 1` values are `None`
pub fn sma_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() < period {
        return out;
    }

    let mut window_sum: f64 = prices[..period].iter().sum();
    out[period - 1] = Some(window_sum / period as f64);
    for i in period..prices.len() {
        window_sum += prices[i] - prices[i - period];
        out[i] = Some(window_sum / period as f64);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period` values
pub fn ema_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = prices[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);

    for i in period..prices.len() {
        ema = (prices[i] - ema) * multiplier + ema;
        out[i] = Some(ema);
    }
    out
}

/// RSI (Relative Strength Index) with Wilder smoothing.
///
/// The first value appears at index `period`, once `period` price changes exist.
pub fn rsi_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() < period + 1 {
        return out;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| c.max(0.0);
    let loss = |c: f64| (-c).max(0.0);

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period..changes.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(changes[i])) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(changes[i])) / period as f64;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        return 50.0; // Flat series
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// MACD line, signal line and histogram series.
///
/// The MACD line starts at index `slow - 1`; the signal line (an EMA of the
/// MACD line) starts `signal - 1` bars later.
pub fn macd_series(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let fast = ema_series(prices, fast_period);
    let slow = ema_series(prices, slow_period);

    let macd: Vec<Option<f64>> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let mut signal = vec![None; prices.len()];
    if let Some(start) = macd.iter().position(Option::is_some) {
        let defined: Vec<f64> = macd[start..].iter().flatten().copied().collect();
        for (offset, value) in ema_series(&defined, signal_period).into_iter().enumerate() {
            signal[start + offset] = value;
        }
    }

    let histogram = macd
        .iter()
        .zip(&signal)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    (macd, signal, histogram)
}

/// Most recent readings for a single ticker's indicator rows
pub fn latest_snapshot(rows: &[IndicatorRow]) -> Option<TechnicalSignals> {
    let last = rows.last()?;

    let macd = match (last.macd, last.macd_signal, last.macd_histogram) {
        (Some(macd_line), Some(signal_line), Some(histogram)) => {
            let trend = if histogram > 0.0 {
                "bullish"
            } else if histogram < 0.0 {
                "bearish"
            } else {
                "neutral"
            };
            Some(MACDSignal {
                macd_line,
                signal_line,
                histogram,
                trend: trend.to_string(),
            })
        }
        _ => None,
    };

    let (signal, confidence) = determine_signal(last.rsi, macd.as_ref(), last.sma_short, last.sma_long);

    Some(TechnicalSignals {
        ticker: last.ticker.clone(),
        date: last.date,
        rsi: last.rsi,
        macd,
        sma_short: last.sma_short,
        sma_long: last.sma_long,
        signal,
        confidence,
    })
}

/// Combine SMA crossover, MACD momentum and RSI extremes into one signal.
///
/// Each available indicator votes up to 3 points; confidence is the net vote
/// over the maximum possible.
fn determine_signal(
    rsi: Option<f64>,
    macd: Option<&MACDSignal>,
    sma_short: Option<f64>,
    sma_long: Option<f64>,
) -> (TrendSignal, f64) {
    let mut net = 0i32;
    let mut voters = 0i32;

    let uptrend = match (sma_short, sma_long) {
        (Some(short), Some(long)) if long != 0.0 => {
            voters += 1;
            let separation_pct = (short - long) / long * 100.0;
            let weight = if separation_pct.abs() > 1.0 { 3 } else { 2 };
            if short > long {
                net += weight;
                Some(true)
            } else if short < long {
                net -= weight;
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    };

    if let Some(m) = macd {
        voters += 1;
        if m.histogram > 0.0 {
            net += 2;
        } else if m.histogram < 0.0 {
            net -= 2;
        }
        if m.macd_line > 0.0 && m.histogram > 0.0 {
            net += 1;
        } else if m.macd_line < 0.0 && m.histogram < 0.0 {
            net -= 1;
        }
    }

    if let Some(rsi) = rsi {
        voters += 1;
        net += match uptrend {
            // Overbought readings are normal in an uptrend, oversold ones are pullbacks
            Some(true) if rsi < 30.0 => 2,
            Some(true) if rsi > 50.0 => 1,
            Some(false) if rsi > 70.0 => -2,
            Some(false) if rsi < 50.0 => -1,
            None if rsi < 30.0 => 1,
            None if rsi > 70.0 => -1,
            _ => 0,
        };
    }

    if voters == 0 {
        return (TrendSignal::Neutral, 0.0);
    }

    let confidence = (net.abs() as f64 / (voters * 3) as f64).min(1.0);
    let signal = match net {
        s if s >= 5 => TrendSignal::StrongBuy,
        s if s >= 2 => TrendSignal::Buy,
        s if s <= -5 => TrendSignal::StrongSell,
        s if s <= -2 => TrendSignal::Sell,
        _ => TrendSignal::Neutral,
    };

    (signal, confidence)
}

/// Average/max/min close and volume dispersion per ticker
pub fn summarize_prices(bars: &[PriceBar]) -> Vec<PriceSummary> {
    group_by_ticker(bars)
        .into_iter()
        .filter(|(_, series)| !series.is_empty())
        .map(|(ticker, series)| {
            let n = series.len() as f64;
            let closes = series.iter().map(|b| b.close);
            let average_close = closes.clone().sum::<f64>() / n;
            let max_close = closes.clone().fold(f64::NEG_INFINITY, f64::max);
            let min_close = closes.fold(f64::INFINITY, f64::min);

            let volume_std = if series.len() < 2 {
                None
            } else {
                let mean = series.iter().map(|b| b.volume as f64).sum::<f64>() / n;
                let var = series
                    .iter()
                    .map(|b| (b.volume as f64 - mean).powi(2))
                    .sum::<f64>()
                    / (n - 1.0);
                Some(var.sqrt())
            };

            PriceSummary {
                ticker: ticker.to_string(),
                bars: series.len(),
                average_close,
                max_close,
                min_close,
                volume_std,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(ticker: &str, closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::from_close(ticker, start + chrono::Days::new(i as u64), c))
            .collect()
    }

    #[test]
    fn test_sma_calculation() {
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let sma = sma_series(&prices, 3);
        assert_eq!(sma[0], None);
        assert_eq!(sma[1], None);
        assert!((sma[4].unwrap_or_default() - 13.0).abs() < 0.01); // (12+13+14)/3
    }

    #[test]
    fn test_short_series_has_no_moving_average() {
        let rows = compute_indicators(&bars("AAPL", &[1.0, 2.0, 3.0, 4.0, 5.0]), &IndicatorSettings::default());
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.sma_short.is_none() && r.sma_long.is_none()));
        assert!(rows.iter().all(|r| r.rsi.is_none() && r.macd.is_none()));
    }

    #[test]
    fn test_rsi_calculation() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.25, 44.5, 44.75, 45.0,
            45.25, 45.5, 45.75, 46.0, 45.75, 45.5,
        ];
        let rsi = rsi_series(&prices, 14);
        assert!(rsi[..14].iter().all(Option::is_none));
        let value = rsi[14].unwrap_or_default();
        assert!(value > 50.0 && value < 100.0); // Should be bullish
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(rsi_series(&rising, 14)[19], Some(100.0));
        let flat = vec![5.0; 20];
        assert_eq!(rsi_series(&flat, 14)[19], Some(50.0));
    }

    #[test]
    fn test_macd_warmup() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let (macd, signal, hist) = macd_series(&prices, 12, 26, 9);
        assert!(macd[..25].iter().all(Option::is_none));
        assert!(macd[25].is_some());
        assert!(signal[..33].iter().all(Option::is_none));
        assert!(signal[33].is_some());
        assert_eq!(hist[33].is_some(), signal[33].is_some());
    }

    #[test]
    fn test_constant_series_macd_is_zero() {
        let prices = vec![50.0; 40];
        let (macd, signal, _) = macd_series(&prices, 12, 26, 9);
        assert!(macd[39].unwrap_or(f64::NAN).abs() < 1e-12);
        assert!(signal[39].unwrap_or(f64::NAN).abs() < 1e-12);
    }

    #[test]
    fn test_indicators_independent_per_ticker() {
        let mut all = bars("AAPL", &[1.0, 2.0, 3.0]);
        all.extend(bars("MSFT", &[10.0, 20.0]));
        let settings = IndicatorSettings { sma_short: 2, ..IndicatorSettings::default() };
        let rows = compute_indicators(&all, &settings);
        let msft: Vec<_> = rows.iter().filter(|r| r.ticker == "MSFT").collect();
        assert_eq!(msft[0].sma_short, None);
        assert_eq!(msft[1].sma_short, Some(15.0));
    }

    #[test]
    fn test_signal_determination() {
        let (signal, confidence) = determine_signal(
            Some(65.0),
            Some(&MACDSignal {
                macd_line: 1.0,
                signal_line: 0.5,
                histogram: 0.5,
                trend: "bullish".to_string(),
            }),
            Some(100.0),
            Some(95.0), // 5% above the long average
        );
        // SMA(+3), MACD(+3), RSI(+1) = 7
        assert_eq!(signal, TrendSignal::StrongBuy);
        assert!(confidence > 0.0);
        assert_eq!(determine_signal(None, None, None, None), (TrendSignal::Neutral, 0.0));
    }

    #[test]
    fn test_summarize_prices() {
        let mut series = bars("AAPL", &[100.0, 110.0, 105.0]);
        series[0].volume = 10;
        series[1].volume = 20;
        series[2].volume = 30;
        let summary = summarize_prices(&series);
        assert_eq!(summary.len(), 1);
        assert!((summary[0].average_close - 105.0).abs() < 1e-12);
        assert_eq!(summary[0].max_close, 110.0);
        assert_eq!(summary[0].min_close, 100.0);
        assert!((summary[0].volume_std.unwrap_or_default() - 10.0).abs() < 1e-12);
    }
}
