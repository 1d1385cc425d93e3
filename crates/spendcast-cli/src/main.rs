//! Spendcast CLI - Discretionary spending forecaster
//!
//! Usage:
//!   spendcast forecast --input history.csv     Forecast the next 30 days
//!   spendcast classify --input request.json    Show irregular transactions
//!   spendcast config                           Show effective configuration

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Forecast {
            input,
            obligations,
            start,
            horizon,
            json,
        } => commands::cmd_forecast(
            config,
            &input,
            &obligations,
            start.as_deref(),
            horizon,
            json,
        ),
        Commands::Classify {
            input,
            obligations,
            all,
        } => commands::cmd_classify(config, &input, &obligations, all),
        Commands::Config => commands::cmd_config(config),
    }
}
