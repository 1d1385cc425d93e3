//! Day-by-day spend forecast
//!
//! Runs the whole pipeline: classify the history, aggregate irregular spend per
//! day, select weekday models, estimate the payday effect and then emit one
//! [`DailyForecast`] per day of the horizon.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::DailySpendMap;
use crate::classify::TransactionClassifier;
use crate::config::ForecastConfig;
use crate::error::{Error, Result};
use crate::fit::DistributionFitter;
use crate::models::{DailyForecast, ModelTier, Obligation, Transaction};
use crate::payday::{PaydayEffectEstimator, PaydayProfile};
use crate::weekday::{DayModel, WeekdayModelSelector};

/// Forecast plus the diagnostics describing how it was produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    /// Overall model tier
    pub model: ModelTier,
    pub irregular_txn_count: usize,
    /// Distinct days with irregular spend
    pub total_days_history: usize,
    pub payday: PaydayProfile,
    pub daily_forecasts: Vec<DailyForecast>,
}

/// The forecasting engine.
///
/// Holds only configuration, so one instance can serve any number of
/// independent requests.
#[derive(Debug, Clone, Default)]
pub struct SpendingForecaster {
    config: ForecastConfig,
}

impl SpendingForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn classifier(&self) -> TransactionClassifier {
        TransactionClassifier::with_config(self.config.classifier.clone())
    }

    /// Forecast `horizon_days` consecutive days starting at `start`
    pub fn forecast(
        &self,
        transactions: &[Transaction],
        obligations: &[Obligation],
        start: NaiveDate,
        horizon_days: u32,
    ) -> Result<Vec<DailyForecast>> {
        self.forecast_report(transactions, obligations, start, horizon_days)
            .map(|report| report.daily_forecasts)
    }

    /// Forecast and return the diagnostics alongside the daily values
    pub fn forecast_report(
        &self,
        transactions: &[Transaction],
        obligations: &[Obligation],
        start: NaiveDate,
        horizon_days: u32,
    ) -> Result<ForecastReport> {
        self.check_inputs(transactions, start, horizon_days)?;

        let irregular = self.classifier().classify(transactions, obligations);
        let daily = DailySpendMap::aggregate(irregular.iter().copied());
        debug!(
            "{} irregular transactions over {} days of history",
            irregular.len(),
            daily.len()
        );

        let selector = WeekdayModelSelector::with_config(
            DistributionFitter::with_config(self.config.fitting.clone()),
            self.config.weekday.clone(),
        );
        let models = selector.select(&daily);

        let payday = if models.has_history() {
            PaydayEffectEstimator::with_config(self.config.payday.clone()).estimate(
                transactions,
                &daily,
                models.overall_mean(),
            )
        } else {
            PaydayProfile::none()
        };

        let decay = self.config.payday.secondary_decay;
        let daily_forecasts: Vec<DailyForecast> = start
            .iter_days()
            .take(horizon_days as usize)
            .map(|date| {
                let model = models.model_for(date.weekday());
                if model == DayModel::Zero {
                    return DailyForecast::zero(date);
                }
                let estimate = model
                    .estimate()
                    .scaled(payday.factor_for(date, decay))
                    .finalize();
                DailyForecast {
                    date,
                    mean: estimate.mean,
                    p10: estimate.low,
                    p90: estimate.high,
                }
            })
            .collect();

        let report = ForecastReport {
            model: models.tier(),
            irregular_txn_count: irregular.len(),
            total_days_history: daily.len(),
            payday,
            daily_forecasts,
        };

        info!(
            "Forecast {} days from {} using {} model ({} days of history)",
            horizon_days, start, report.model, report.total_days_history
        );
        Ok(report)
    }

    fn check_inputs(
        &self,
        transactions: &[Transaction],
        start: NaiveDate,
        horizon_days: u32,
    ) -> Result<()> {
        let max_days = self.config.horizon.max_days;
        if horizon_days == 0 || horizon_days > max_days {
            return Err(Error::InvalidInput(format!(
                "horizon_days must be between 1 and {}, got {}",
                max_days, horizon_days
            )));
        }

        if start
            .checked_add_days(Days::new(u64::from(horizon_days - 1)))
            .is_none()
        {
            return Err(Error::InvalidInput(format!(
                "Forecast window of {} days from {} leaves the supported calendar",
                horizon_days, start
            )));
        }

        if let Some(tx) = transactions.iter().find(|tx| !tx.amount.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Transaction on {} has a non-finite amount",
                tx.booked_at
            )));
        }

        Ok(())
    }
}

/// Forecast with the default configuration
pub fn forecast(
    transactions: &[Transaction],
    obligations: &[Obligation],
    start: NaiveDate,
    horizon_days: u32,
) -> Result<Vec<DailyForecast>> {
    SpendingForecaster::new().forecast(transactions, obligations, start, horizon_days)
}

/// Forecast report with the default configuration
pub fn forecast_report(
    transactions: &[Transaction],
    obligations: &[Obligation],
    start: NaiveDate,
    horizon_days: u32,
) -> Result<ForecastReport> {
    SpendingForecaster::new().forecast_report(transactions, obligations, start, horizon_days)
}
