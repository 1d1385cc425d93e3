//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_config` - Shared utility to resolve the forecast config
//! - `load_request` - Shared utility to read a JSON request or CSV history
//! - `cmd_config` - Show the effective configuration

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use spendcast_core::{
    config::default_config_path, import::parse_history_csv, load_config, ForecastRequest,
    LoadedConfig, Obligation,
};
use tracing::debug;

/// Resolve config from an explicit path, the data dir override or the defaults
pub fn open_config(config_path: Option<&Path>) -> Result<LoadedConfig> {
    let loaded = load_config(config_path).context("Failed to load forecast config")?;
    debug!("Using config from {}", loaded.source);
    Ok(loaded)
}

/// Read a forecast request.
///
/// `.json` files are parsed as a full request; anything else is treated as a
/// CSV transaction history with no obligations.
pub fn load_request(input: &Path) -> Result<ForecastRequest> {
    let file =
        File::open(input).with_context(|| format!("Failed to open file: {}", input.display()))?;

    let is_json = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        ForecastRequest::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse request: {}", input.display()))
    } else {
        let transactions = parse_history_csv(file)
            .with_context(|| format!("Failed to import history: {}", input.display()))?;
        Ok(ForecastRequest {
            transactions,
            ..Default::default()
        })
    }
}

/// Append obligations given on the command line
pub fn add_obligations(request: &mut ForecastRequest, merchants: &[String]) {
    request
        .obligations
        .extend(merchants.iter().map(|m| Obligation::new(m.as_str())));
}

pub fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    let loaded = open_config(config_path)?;
    let c = &loaded.config;

    println!();
    println!("⚙️  Forecast Configuration");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Source: {}", loaded.source);
    if let Some(path) = default_config_path() {
        println!("   Override path: {}", path.display());
    }

    println!();
    println!("   [classifier]");
    println!("   recurring_cv_threshold  = {}", c.classifier.recurring_cv_threshold);
    println!("   min_recurring_matches   = {}", c.classifier.min_recurring_matches);
    println!("   description_key_chars   = {}", c.classifier.description_key_chars);
    println!("   [fitting]");
    println!("   outlier_sigma           = {}", c.fitting.outlier_sigma);
    println!("   low_quantile            = {}", c.fitting.low_quantile);
    println!("   high_quantile           = {}", c.fitting.high_quantile);
    println!("   [weekday]");
    println!("   min_samples_per_weekday = {}", c.weekday.min_samples_per_weekday);
    println!("   flat_low_factor         = {}", c.weekday.flat_low_factor);
    println!("   flat_high_factor        = {}", c.weekday.flat_high_factor);
    println!("   [payday]");
    println!("   income_threshold        = {}", c.payday.income_threshold);
    println!("   max_multiplier          = {}", c.payday.max_multiplier);
    println!("   min_samples             = {}", c.payday.min_samples);
    println!("   secondary_decay         = {}", c.payday.secondary_decay);
    println!("   [horizon]");
    println!("   max_days                = {}", c.horizon.max_days);
    println!("   default_days            = {}", c.horizon.default_days);
    println!("   max_transactions        = {}", c.horizon.max_transactions);
    println!();

    Ok(())
}
