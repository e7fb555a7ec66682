//! CSV/JSON writers and console summaries for pipeline results

use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::correlation::CorrelationSummary;
use crate::analysis::descriptive::{weekday_label, DescriptiveReport};
use crate::data::indicators::TechnicalSignals;
use crate::data::sentiment::interpret_sentiment;
use crate::data::DataResult;

pub const ALIGNED_FILE: &str = "aligned_sentiment_returns.csv";
pub const SUMMARY_CSV_FILE: &str = "correlation_summary.csv";
pub const SUMMARY_JSON_FILE: &str = "correlation_summary.json";
pub const INDICATORS_FILE: &str = "indicators.csv";
pub const DAILY_SENTIMENT_FILE: &str = "daily_sentiment.csv";

/// Serialize rows as CSV with a header derived from the row type
pub fn write_csv<T: Serialize, P: AsRef<Path>>(rows: &[T], path: P) -> DataResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

/// Write summaries as both CSV and pretty JSON; returns the two paths
pub fn write_summaries(summaries: &[CorrelationSummary], output_dir: &Path) -> DataResult<(PathBuf, PathBuf)> {
    let csv_path = output_dir.join(SUMMARY_CSV_FILE);
    write_csv(summaries, &csv_path)?;

    let json_path = output_dir.join(SUMMARY_JSON_FILE);
    let file = File::create(&json_path)?;
    serde_json::to_writer_pretty(file, summaries)?;
    info!(path = %json_path.display(), "Wrote correlation summary JSON");

    Ok((csv_path, json_path))
}

fn significance(p_value: f64) -> &'static str {
    if p_value < 0.01 {
        "significant at 1%"
    } else if p_value < 0.05 {
        "significant at 5%"
    } else {
        "not significant"
    }
}

pub fn display_correlation(overall: &CorrelationSummary, per_ticker: &[CorrelationSummary]) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SENTIMENT vs DAILY RETURN CORRELATION             ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    println!("📈 Pearson correlation: {:.4} (p-value: {:.4})", overall.coefficient, overall.p_value);
    println!("   Rows used: {}", overall.sample_size);
    println!("   Sentiment lag: {} trading day(s)", overall.lag);
    println!("   Result: {}", significance(overall.p_value));

    if !per_ticker.is_empty() {
        println!("\n📊 Per ticker:");
        println!("   {:<8} {:>10} {:>10} {:>6}", "TICKER", "CORR", "P-VALUE", "N");
        for s in per_ticker {
            println!(
                "   {:<8} {:>10.4} {:>10.4} {:>6}",
                s.scope, s.coefficient, s.p_value, s.sample_size
            );
        }
    }
    println!();
}

pub fn display_descriptive(report: &DescriptiveReport, top_n: usize) {
    println!("\n📰 Headline length (characters):");
    let l = &report.lengths;
    println!("   count: {}", l.count);
    for (label, value) in [
        ("mean", l.mean),
        ("std", l.std),
        ("min", l.min),
        ("25%", l.q25),
        ("50%", l.median),
        ("75%", l.q75),
        ("max", l.max),
    ] {
        match value {
            Some(v) => println!("   {}: {:.2}", label, v),
            None => println!("   {}: -", label),
        }
    }

    println!("\n🏢 Top publishers:");
    for p in report.publishers.iter().take(top_n) {
        println!("   {:<40} {}", p.publisher, p.articles);
    }

    println!("\n🕒 Articles by hour:");
    for (hour, count) in report.by_hour.iter().enumerate().filter(|(_, c)| **c > 0) {
        println!("   {:02}:00  {}", hour, count);
    }

    println!("\n📅 Articles by weekday:");
    for (day, count) in report.by_weekday.iter().enumerate() {
        println!("   {}  {}", weekday_label(day), count);
    }
    println!();
}

pub fn display_signals(signals: &TechnicalSignals) {
    let fmt = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string());
    println!(
        "   {:<8} {}  RSI {:>7}  SMA short {:>9}  SMA long {:>9}  MACD {:>8}  {} ({:.0}%)",
        signals.ticker,
        signals.date,
        fmt(signals.rsi),
        fmt(signals.sma_short),
        fmt(signals.sma_long),
        fmt(signals.macd.as_ref().map(|m| m.histogram)),
        signals.signal.as_str(),
        signals.confidence * 100.0
    );
}

pub fn sentiment_label(score: f64) -> String {
    format!("{:+.3} ({})", score, interpret_sentiment(score))
}
