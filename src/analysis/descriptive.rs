//! Descriptive statistics over the headline feed

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::data::Headline;

/// Distribution of headline lengths (in characters)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LengthSummary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherCount {
    pub publisher: String,
    pub articles: usize,
}

/// Everything the describe stage produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveReport {
    pub lengths: LengthSummary,
    pub publishers: Vec<PublisherCount>,
    /// Article counts by hour of day, index 0 = midnight
    pub by_hour: Vec<usize>,
    /// Article counts by weekday, index 0 = Monday
    pub by_weekday: Vec<usize>,
}

/// Linear-interpolated quantile of sorted data
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

pub fn headline_length_statistics(headlines: &[Headline]) -> LengthSummary {
    let mut lengths: Vec<f64> = headlines
        .iter()
        .map(|h| h.headline.chars().count() as f64)
        .collect();
    if lengths.is_empty() {
        return LengthSummary::default();
    }
    lengths.sort_by(f64::total_cmp);

    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<f64>() / n;
    let std = if lengths.len() > 1 {
        let var = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    } else {
        None
    };

    LengthSummary {
        count: lengths.len(),
        mean: Some(mean),
        std,
        min: lengths.first().copied(),
        q25: quantile(&lengths, 0.25),
        median: quantile(&lengths, 0.5),
        q75: quantile(&lengths, 0.75),
        max: lengths.last().copied(),
    }
}

/// Article counts by publisher, most frequent first (ties by name)
pub fn articles_per_publisher(headlines: &[Headline]) -> Vec<PublisherCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for h in headlines.iter().filter(|h| !h.publisher.is_empty()) {
        *counts.entry(h.publisher.as_str()).or_default() += 1;
    }

    let mut table: Vec<PublisherCount> = counts
        .into_iter()
        .map(|(publisher, articles)| PublisherCount {
            publisher: publisher.to_string(),
            articles,
        })
        .collect();
    table.sort_by(|a, b| b.articles.cmp(&a.articles).then_with(|| a.publisher.cmp(&b.publisher)));
    table
}

pub fn posting_hour_histogram(headlines: &[Headline]) -> [usize; 24] {
    let mut bins = [0usize; 24];
    for h in headlines {
        bins[h.published_at.hour() as usize] += 1;
    }
    bins
}

pub fn posting_weekday_histogram(headlines: &[Headline]) -> [usize; 7] {
    let mut bins = [0usize; 7];
    for h in headlines {
        bins[h.published_at.weekday().num_days_from_monday() as usize] += 1;
    }
    bins
}

pub fn weekday_label(index: usize) -> &'static str {
    const LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    LABELS.get(index).copied().unwrap_or("?")
}

/// Run every descriptive statistic. Empty input yields empty summaries.
pub fn describe(headlines: &[Headline]) -> DescriptiveReport {
    let report = DescriptiveReport {
        lengths: headline_length_statistics(headlines),
        publishers: articles_per_publisher(headlines),
        by_hour: posting_hour_histogram(headlines).to_vec(),
        by_weekday: posting_weekday_histogram(headlines).to_vec(),
    };
    info!(
        headlines = headlines.len(),
        publishers = report.publishers.len(),
        "Computed descriptive statistics"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn headline(text: &str, publisher: &str, ts: &str) -> Headline {
        let published_at = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").expect("valid timestamp");
        Headline {
            headline: text.to_string(),
            publisher: publisher.to_string(),
            published_at,
            date: published_at.date(),
            ticker: "AAPL".to_string(),
        }
    }

    #[test]
    fn test_empty_input_gives_empty_summaries() {
        let report = describe(&[]);
        assert_eq!(report.lengths, LengthSummary::default());
        assert!(report.publishers.is_empty());
        assert_eq!(report.by_hour.iter().sum::<usize>(), 0);
        assert_eq!(report.by_weekday.len(), 7);
    }

    #[test]
    fn test_length_statistics() {
        let headlines = vec![
            headline("ab", "A", "2024-01-01 09:00:00"),
            headline("abcd", "A", "2024-01-01 09:00:00"),
            headline("abcdef", "B", "2024-01-01 09:00:00"),
            headline("abcdefgh", "B", "2024-01-01 09:00:00"),
        ];
        let stats = headline_length_statistics(&headlines);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, Some(5.0));
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(8.0));
        assert_eq!(stats.median, Some(5.0));
        assert_eq!(stats.q25, Some(3.5));
        assert_eq!(stats.q75, Some(6.5));
        assert!((stats.std.unwrap_or_default() - (20.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_publisher_ranking() {
        let headlines = vec![
            headline("x", "Zacks", "2024-01-01 09:00:00"),
            headline("x", "Benzinga", "2024-01-01 09:00:00"),
            headline("x", "Benzinga", "2024-01-01 09:00:00"),
            headline("x", "Accesswire", "2024-01-01 09:00:00"),
            headline("x", "", "2024-01-01 09:00:00"),
        ];
        let table = articles_per_publisher(&headlines);
        assert_eq!(table[0], PublisherCount { publisher: "Benzinga".into(), articles: 2 });
        assert_eq!(table[1].publisher, "Accesswire");
        assert_eq!(table[2].publisher, "Zacks");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_posting_histograms() {
        // 2024-01-01 is a Monday
        let headlines = vec![
            headline("x", "A", "2024-01-01 09:15:00"),
            headline("x", "A", "2024-01-01 09:45:00"),
            headline("x", "A", "2024-01-06 16:00:00"),
        ];
        let hours = posting_hour_histogram(&headlines);
        assert_eq!(hours[9], 2);
        assert_eq!(hours[16], 1);
        let days = posting_weekday_histogram(&headlines);
        assert_eq!(days[0], 2);
        assert_eq!(days[5], 1);
        assert_eq!(weekday_label(5), "Sat");
    }
}
