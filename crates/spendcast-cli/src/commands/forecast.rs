//! Forecast command implementation

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use spendcast_core::{ForecastConfig, ForecastReport, SpendingForecaster};

use super::{add_obligations, load_request, open_config};

pub fn cmd_forecast(
    config_path: Option<&Path>,
    input: &Path,
    obligations: &[String],
    start: Option<&str>,
    horizon: Option<u32>,
    json: bool,
) -> Result<()> {
    let loaded = open_config(config_path)?;
    let today = Local::now().date_naive();
    let report = build_forecast(&loaded.config, input, obligations, start, horizon, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, loaded.config.payday.secondary_decay);
    }
    Ok(())
}

/// Load the input, apply command-line overrides and run the forecast
pub fn build_forecast(
    config: &ForecastConfig,
    input: &Path,
    obligations: &[String],
    start: Option<&str>,
    horizon: Option<u32>,
    today: NaiveDate,
) -> Result<ForecastReport> {
    let mut request = load_request(input)?;
    add_obligations(&mut request, obligations);
    if let Some(start) = start {
        request.forecast_start = Some(start.to_string());
    }
    if let Some(horizon) = horizon {
        request.horizon_days = Some(i64::from(horizon));
    }

    let request = request
        .validate(today, config)
        .context("Invalid forecast request")?;
    let report = request
        .run(&SpendingForecaster::with_config(config.clone()))
        .context("Forecast failed")?;
    Ok(report)
}

fn print_report(report: &ForecastReport, secondary_decay: f64) {
    println!();
    println!("📈 Spending Forecast ({} model)", report.model);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   History: {} irregular transactions over {} days",
        report.irregular_txn_count, report.total_days_history
    );
    match report.payday.day_of_month {
        Some(day) if report.payday.is_active() => println!(
            "   Payday: day {} of the month (×{:.2} after payday)",
            day, report.payday.multiplier
        ),
        Some(day) => println!("   Payday: day {} of the month (no spend effect)", day),
        None => println!("   Payday: not detected"),
    }
    println!();
    println!(
        "   {:10}  {:3}  {:>9}  {:>9}  {:>9}",
        "Date", "Day", "Mean", "P10", "P90"
    );

    for day in &report.daily_forecasts {
        let marker = if report.payday.factor_for(day.date, secondary_decay) != 1.0 {
            "💰"
        } else {
            ""
        };
        println!(
            "   {}  {}  {:>9.2}  {:>9.2}  {:>9.2}  {}",
            day.date,
            day.date.format("%a"),
            day.mean,
            day.p10,
            day.p90,
            marker
        );
    }

    let total: f64 = report.daily_forecasts.iter().map(|d| d.mean).sum();
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Expected total over {} days: {:.2}",
        report.daily_forecasts.len(),
        total
    );
    println!();
}
