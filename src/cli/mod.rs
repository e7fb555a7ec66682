use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::config::{parse_ticker_list, Config};

pub mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "sentiment-returns",
    about = "Correlate financial news sentiment with daily stock returns",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Input and filter overrides shared by the subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Headlines CSV (headline, publisher, date, stock)
    #[arg(long)]
    pub news: Option<PathBuf>,

    /// Price CSV or directory of per-ticker price CSVs
    #[arg(long)]
    pub prices: Option<PathBuf>,

    /// Directory the result tables are written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ticker for a price file without a ticker column
    #[arg(long)]
    pub ticker: Option<String>,

    /// Keep records on or after this date
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Keep records on or before this date
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Comma-separated tickers to keep
    #[arg(long)]
    pub tickers: Option<String>,
}

impl InputArgs {
    /// Flags take precedence over environment configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(news) = &self.news {
            config.inputs.news_path = news.clone();
        }
        if let Some(prices) = &self.prices {
            config.inputs.prices_path = prices.clone();
        }
        if let Some(output) = &self.output {
            config.inputs.output_dir = output.clone();
        }
        if let Some(ticker) = &self.ticker {
            config.inputs.default_ticker = Some(ticker.trim().to_uppercase());
        }
        if self.start_date.is_some() {
            config.filter.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            config.filter.end_date = self.end_date;
        }
        if let Some(tickers) = &self.tickers {
            config.filter.tickers = Some(parse_ticker_list(tickers));
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align daily sentiment with returns and report the Pearson correlation
    Correlate {
        #[command(flatten)]
        inputs: InputArgs,

        /// Trading days between the sentiment and the return it is paired with
        #[arg(short, long)]
        lag: Option<usize>,
    },

    /// Headline length, publisher and posting-time statistics
    Describe {
        #[command(flatten)]
        inputs: InputArgs,

        /// Number of publishers to list
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Compute SMA, RSI and MACD per ticker and write indicators.csv
    Indicators {
        #[command(flatten)]
        inputs: InputArgs,

        #[arg(long)]
        sma_short: Option<usize>,

        #[arg(long)]
        sma_long: Option<usize>,

        #[arg(long)]
        rsi_period: Option<usize>,
    },

    /// Score headlines and write per-day sentiment to daily_sentiment.csv
    Sentiment {
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Most frequent headline keywords
    Keywords {
        #[command(flatten)]
        inputs: InputArgs,

        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Articles per day and top publisher email domains
    Timeline {
        #[command(flatten)]
        inputs: InputArgs,

        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Merge a directory of per-ticker price CSVs into one file
    Combine {
        /// Directory of <TICKER>.csv files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Combined CSV to write
        #[arg(short = 'f', long, default_value = "data/combined_stocks.csv")]
        output_file: PathBuf,
    },
}

/// Execute CLI command against the loaded configuration
pub fn run(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Correlate { inputs, lag } => {
            inputs.apply(&mut config);
            if let Some(lag) = lag {
                config.analysis.sentiment_lag = lag;
            }
            info!(lag = config.analysis.sentiment_lag, "Running correlation");
            commands::correlate(config)?;
        }
        Commands::Describe { inputs, top_n } => {
            inputs.apply(&mut config);
            if let Some(n) = top_n {
                config.analysis.top_n = n;
            }
            info!("Running descriptive statistics");
            commands::describe(config)?;
        }
        Commands::Indicators {
            inputs,
            sma_short,
            sma_long,
            rsi_period,
        } => {
            inputs.apply(&mut config);
            if let Some(w) = sma_short {
                config.indicators.sma_short = w;
            }
            if let Some(w) = sma_long {
                config.indicators.sma_long = w;
            }
            if let Some(p) = rsi_period {
                config.indicators.rsi_period = p;
            }
            info!("Computing technical indicators");
            commands::indicators(config)?;
        }
        Commands::Sentiment { inputs } => {
            inputs.apply(&mut config);
            info!("Scoring headline sentiment");
            commands::sentiment(config)?;
        }
        Commands::Keywords { inputs, top_n } => {
            inputs.apply(&mut config);
            if let Some(n) = top_n {
                config.analysis.top_n = n;
            }
            info!("Extracting keywords");
            commands::keywords(config)?;
        }
        Commands::Timeline { inputs, top_n } => {
            inputs.apply(&mut config);
            if let Some(n) = top_n {
                config.analysis.top_n = n;
            }
            info!("Building publication timeline");
            commands::timeline(config)?;
        }
        Commands::Combine {
            input_dir,
            output_file,
        } => {
            info!("Combining price files from {}", input_dir.display());
            commands::combine(config, input_dir, output_file)?;
        }
    }

    Ok(())
}
