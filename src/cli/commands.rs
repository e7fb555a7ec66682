use anyhow::Result;
use std::path::PathBuf;
use tracing::warn;

use crate::analysis::descriptive::describe as describe_headlines;
use crate::analysis::text::top_keywords;
use crate::analysis::timeline::{daily_article_counts, peak_day, top_email_domains};
use crate::config::Config;
use crate::data::indicators::{latest_snapshot, summarize_prices};
use crate::orchestrator::report::{display_descriptive, display_signals, sentiment_label};
use crate::orchestrator::{combine_price_files, Pipeline};

/// Correlate daily sentiment with returns and write the result tables
pub fn correlate(config: Config) -> Result<()> {
    let output_dir = config.inputs.output_dir.clone();
    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run_correlation()?;

    report.display_summary();
    println!("✅ Results written to {}", output_dir.display());
    Ok(())
}

/// Print headline length, publisher and posting-time statistics
pub fn describe(config: Config) -> Result<()> {
    let top_n = config.analysis.top_n;
    let pipeline = Pipeline::new(config)?;
    let headlines = pipeline.load_headlines()?;

    let report = describe_headlines(&headlines);
    display_descriptive(&report, top_n);
    Ok(())
}

/// Compute indicators, write indicators.csv and print the latest reading per ticker
pub fn indicators(config: Config) -> Result<()> {
    let pipeline = Pipeline::new(config)?;
    let bars = pipeline.load_prices()?;
    let (rows, path) = pipeline.run_indicators(&bars)?;

    println!("\n📊 Latest technical readings:");
    for ticker_rows in rows.chunk_by(|a, b| a.ticker == b.ticker) {
        match latest_snapshot(ticker_rows) {
            Some(signals) => display_signals(&signals),
            None => warn!("No indicator rows for ticker"),
        }
    }

    println!("\n💵 Price summary:");
    for summary in summarize_prices(&bars) {
        println!(
            "   {:<8} bars {:>6}  avg close {:>10.2}  range {:.2}-{:.2}  volume std {}",
            summary.ticker,
            summary.bars,
            summary.average_close,
            summary.min_close,
            summary.max_close,
            summary
                .volume_std
                .map(|v| format!("{:.0}", v))
                .unwrap_or_else(|| "-".to_string())
        );
    }

    println!("\n✅ {} indicator rows written to {}", rows.len(), path.display());
    Ok(())
}

/// Score headlines, write daily_sentiment.csv and print the most extreme days
pub fn sentiment(config: Config) -> Result<()> {
    let top_n = config.analysis.top_n;
    let pipeline = Pipeline::new(config)?;
    let (mut daily, path) = pipeline.run_sentiment()?;

    daily.sort_by(|a, b| b.avg_sentiment.abs().total_cmp(&a.avg_sentiment.abs()));
    println!("\n📰 Strongest sentiment days:");
    for day in daily.iter().take(top_n) {
        println!(
            "   {} {:<8} {} over {} headline(s)",
            day.date,
            day.ticker,
            sentiment_label(day.avg_sentiment),
            day.headline_count
        );
    }

    println!("\n✅ {} daily sentiment rows written to {}", daily.len(), path.display());
    Ok(())
}

/// Print the most frequent headline keywords
pub fn keywords(config: Config) -> Result<()> {
    let top_n = config.analysis.top_n;
    let pipeline = Pipeline::new(config)?;
    let headlines = pipeline.load_headlines()?;

    println!("\n🔑 Top {} keywords:", top_n);
    for (rank, kw) in top_keywords(&headlines, top_n).iter().enumerate() {
        println!("   {:>3}. {:<24} {}", rank + 1, kw.keyword, kw.count);
    }
    Ok(())
}

/// Print publication counts per day and publisher email domains
pub fn timeline(config: Config) -> Result<()> {
    let top_n = config.analysis.top_n;
    let pipeline = Pipeline::new(config)?;
    let headlines = pipeline.load_headlines()?;

    let counts = daily_article_counts(&headlines);
    println!("\n📅 Publication timeline: {} day(s) with articles", counts.len());
    if let (Some(first), Some(last)) = (counts.first(), counts.last()) {
        println!("   Range: {} to {}", first.date, last.date);
    }
    if let Some(peak) = peak_day(&counts) {
        println!("   Busiest day: {} ({} articles)", peak.date, peak.articles);
    }

    let domains = top_email_domains(&headlines, top_n);
    if domains.is_empty() {
        println!("\n📧 No email-address publishers found");
    } else {
        println!("\n📧 Top publisher email domains:");
        for d in &domains {
            println!("   {:<32} {}", d.domain, d.articles);
        }
    }
    Ok(())
}

/// Merge per-ticker price files into one combined CSV
pub fn combine(config: Config, input_dir: PathBuf, output_file: PathBuf) -> Result<()> {
    let tz = config.timezone()?;
    let rows = combine_price_files(&input_dir, &output_file, tz)?;
    println!("✅ Combined {} price rows into {}", rows, output_file.display());
    Ok(())
}
