//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendcast - Forecast day-by-day discretionary spending
#[derive(Parser)]
#[command(name = "spendcast")]
#[command(about = "Forecast irregular spending from transaction history", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Forecast tuning config (TOML)
    ///
    /// Defaults to ~/.local/share/spendcast/config/forecast.toml when present,
    /// otherwise the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forecast daily irregular spending
    Forecast {
        /// Transaction history: a JSON request (.json) or a CSV export
        #[arg(short, long)]
        input: PathBuf,

        /// Merchant of a known recurring bill (repeatable)
        #[arg(long = "obligation")]
        obligations: Vec<String>,

        /// First forecast day, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        start: Option<String>,

        /// Number of days to forecast
        #[arg(long)]
        horizon: Option<u32>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which transactions count as irregular spend
    Classify {
        /// Transaction history: a JSON request (.json) or a CSV export
        #[arg(short, long)]
        input: PathBuf,

        /// Merchant of a known recurring bill (repeatable)
        #[arg(long = "obligation")]
        obligations: Vec<String>,

        /// Show every transaction with its classification
        #[arg(short, long)]
        all: bool,
    },

    /// Show the effective forecast configuration
    Config,
}
