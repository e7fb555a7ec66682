//! Pearson correlation between daily sentiment and daily return

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::alignment::AlignedRecord;
use crate::data::{DataError, DataResult, Stage};

/// Scope label for the pooled, all-ticker summary
pub const ALL_TICKERS: &str = "ALL";

/// Pearson coefficient with its two-sided p-value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PearsonResult {
    pub coefficient: f64,
    pub p_value: f64,
    pub n: usize,
}

/// Correlation summary for one scope (all tickers or a single ticker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    pub scope: String,
    pub coefficient: f64,
    pub p_value: f64,
    pub sample_size: usize,
    pub lag: usize,
}

/// Pearson correlation of two equally long series.
///
/// Pairs where either value is not finite are excluded first. Fails with
/// `InsufficientData` for fewer than two pairs or a constant series.
pub fn pearson(x: &[f64], y: &[f64]) -> DataResult<PearsonResult> {
    if x.len() != y.len() {
        return Err(DataError::insufficient(
            Stage::Correlation,
            x.len().min(y.len()),
            format!("series lengths differ ({} vs {})", x.len(), y.len()),
        ));
    }

    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    let n = pairs.len();

    if n < 2 {
        return Err(DataError::insufficient(
            Stage::Correlation,
            n,
            "at least 2 valid rows are required",
        ));
    }

    let constant_x = pairs.iter().all(|p| p.0 == pairs[0].0);
    let constant_y = pairs.iter().all(|p| p.1 == pairs[0].1);
    if constant_x || constant_y {
        return Err(DataError::insufficient(
            Stage::Correlation,
            n,
            "one of the series has zero variance",
        ));
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let coefficient = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let p_value = two_sided_p_value(coefficient, n)?;

    Ok(PearsonResult {
        coefficient,
        p_value,
        n,
    })
}

/// t-test of r against zero with n - 2 degrees of freedom
fn two_sided_p_value(r: f64, n: usize) -> DataResult<f64> {
    if n <= 2 {
        return Ok(1.0);
    }
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| DataError::insufficient(Stage::Correlation, n, format!("invalid t distribution: {}", e)))?;

    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

fn summarize(scope: &str, records: &[&AlignedRecord], lag: usize) -> DataResult<CorrelationSummary> {
    let sentiment: Vec<f64> = records.iter().map(|r| r.avg_sentiment).collect();
    let returns: Vec<f64> = records.iter().map(|r| r.daily_return).collect();
    let result = pearson(&sentiment, &returns)?;

    Ok(CorrelationSummary {
        scope: scope.to_string(),
        coefficient: result.coefficient,
        p_value: result.p_value,
        sample_size: result.n,
        lag,
    })
}

/// Pooled correlation over every aligned row
pub fn correlate(records: &[AlignedRecord], lag: usize) -> DataResult<CorrelationSummary> {
    let all: Vec<&AlignedRecord> = records.iter().collect();
    let summary = summarize(ALL_TICKERS, &all, lag)?;
    info!(
        coefficient = summary.coefficient,
        p_value = summary.p_value,
        n = summary.sample_size,
        "Pearson correlation between sentiment and return"
    );
    Ok(summary)
}

/// One summary per ticker; tickers without a defined statistic are skipped
pub fn correlate_by_ticker(records: &[AlignedRecord], lag: usize) -> Vec<CorrelationSummary> {
    let mut groups: BTreeMap<&str, Vec<&AlignedRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.ticker.as_str()).or_default().push(r);
    }

    groups
        .into_iter()
        .filter_map(|(ticker, rows)| match summarize(ticker, &rows, lag) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(ticker, "Skipping per-ticker correlation: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(ticker: &str, d: u32, sentiment: f64, ret: f64) -> AlignedRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date");
        AlignedRecord {
            date,
            ticker: ticker.to_string(),
            sentiment_date: date,
            avg_sentiment: sentiment,
            headline_count: 1,
            daily_return: ret,
        }
    }

    #[test]
    fn test_known_coefficient_and_p_value() -> DataResult<()> {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let result = pearson(&x, &y)?;
        assert!((result.coefficient - 0.774_596_669).abs() < 1e-6);
        assert!((result.p_value - 0.124).abs() < 1e-3);
        assert_eq!(result.n, 5);
        Ok(())
    }

    #[test]
    fn test_symmetric() -> DataResult<()> {
        let x = [0.1, -0.3, 0.25, 0.0, 0.7, -0.2];
        let y = [0.01, -0.02, 0.015, 0.003, 0.02, 0.001];
        let xy = pearson(&x, &y)?;
        let yx = pearson(&y, &x)?;
        assert_eq!(xy.coefficient, yx.coefficient);
        assert_eq!(xy.p_value, yx.p_value);
        Ok(())
    }

    #[test]
    fn test_perfect_correlation() -> DataResult<()> {
        let result = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0])?;
        assert!((result.coefficient - 1.0).abs() < 1e-12);
        assert_eq!(result.p_value, 0.0);
        Ok(())
    }

    #[test]
    fn test_two_rows_have_unit_p_value() -> DataResult<()> {
        let result = pearson(&[1.0, 2.0], &[3.0, 1.0])?;
        assert!((result.coefficient + 1.0).abs() < 1e-12);
        assert_eq!(result.p_value, 1.0);
        Ok(())
    }

    #[test]
    fn test_constant_series_is_insufficient() {
        let err = pearson(&[0.1, 0.1, 0.1], &[1.0, 2.0, 4.0]).expect_err("constant x");
        assert!(matches!(err, DataError::InsufficientData { stage: Stage::Correlation, rows: 3, .. }));
        assert!(pearson(&[1.0, 2.0, 4.0], &[0.3; 3]).is_err());
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_strong_correlation_keeps_small_p_value() -> DataResult<()> {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| if i % 2 == 0 { v - 2.0 } else { v + 2.0 })
            .collect();
        let result = pearson(&x, &y)?;
        assert!((result.coefficient - 0.98556).abs() < 1e-4);
        // Far below what 1 - cdf can resolve
        assert!(result.p_value > 0.0);
        assert!(result.p_value < 1e-20);
        Ok(())
    }

    #[test]
    fn test_fewer_than_two_rows_fails() {
        let err = correlate(&[record("AAPL", 3, 0.5, 0.1)], 0).expect_err("one row");
        assert!(matches!(err, DataError::InsufficientData { stage: Stage::Correlation, rows: 1, .. }));
        assert!(correlate(&[], 0).is_err());
    }

    #[test]
    fn test_non_finite_rows_excluded() -> DataResult<()> {
        let result = pearson(&[1.0, f64::NAN, 2.0, 3.0], &[1.0, 5.0, 2.0, f64::INFINITY])?;
        assert_eq!(result.n, 2);
        Ok(())
    }

    #[test]
    fn test_per_ticker_skips_small_groups() {
        let records = vec![
            record("AAPL", 2, 0.1, 0.01),
            record("AAPL", 3, 0.2, 0.03),
            record("AAPL", 4, -0.4, -0.02),
            record("MSFT", 2, 0.5, 0.01),
        ];
        let summaries = correlate_by_ticker(&records, 0);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].scope, "AAPL");
        assert_eq!(summaries[0].sample_size, 3);
        assert!((-1.0..=1.0).contains(&summaries[0].coefficient));
        assert!((0.0..=1.0).contains(&summaries[0].p_value));
    }
}
