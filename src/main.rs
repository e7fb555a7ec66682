use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentiment_returns::cli::{self, Cli};
use sentiment_returns::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::load()?;

    // Initialize tracing with structured JSON logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "sentiment-returns starting up");

    cli::run(cli, config)?;

    info!("sentiment-returns completed successfully");
    Ok(())
}
