//! Weekday model selection
//!
//! History is split into seven weekday buckets. A weekday with enough samples
//! gets its own Gamma fit; other weekdays share a pooled fit over all days. If
//! even the pooled fit fails, a flat estimate derived from the raw mean is used,
//! and with no history at all every day is exactly zero.

use chrono::{Datelike, Weekday};
use tracing::debug;

use crate::aggregate::DailySpendMap;
use crate::config::WeekdayConfig;
use crate::fit::{DistributionFitter, SpendEstimate};
use crate::models::ModelTier;

/// The model chosen for a single forecast day
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayModel {
    /// Fit over this weekday's own history
    Weekday(SpendEstimate),
    /// Fit over all history
    Pooled(SpendEstimate),
    /// Raw mean with fixed percentile factors
    Flat(SpendEstimate),
    /// No spend history
    Zero,
}

impl DayModel {
    pub fn estimate(&self) -> SpendEstimate {
        match self {
            Self::Weekday(e) | Self::Pooled(e) | Self::Flat(e) => *e,
            Self::Zero => SpendEstimate::ZERO,
        }
    }

    pub fn tier(&self) -> ModelTier {
        match self {
            Self::Weekday(_) => ModelTier::PerWeekday,
            Self::Pooled(_) => ModelTier::Pooled,
            Self::Flat(_) => ModelTier::FlatFallback,
            Self::Zero => ModelTier::ExactZero,
        }
    }
}

/// Fitted models for every weekday plus the shared fallbacks
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayModels {
    /// Indexed by days from Monday
    weekday: [Option<SpendEstimate>; 7],
    pooled: Option<SpendEstimate>,
    /// `None` only when there is no history
    flat: Option<SpendEstimate>,
    overall_mean: f64,
    days_of_history: usize,
}

impl WeekdayModels {
    /// Resolve the model for a weekday: own fit, pooled fit, flat, zero
    pub fn model_for(&self, weekday: Weekday) -> DayModel {
        if let Some(estimate) = self.weekday[weekday.num_days_from_monday() as usize] {
            return DayModel::Weekday(estimate);
        }
        if let Some(estimate) = self.pooled {
            return DayModel::Pooled(estimate);
        }
        match self.flat {
            Some(estimate) => DayModel::Flat(estimate),
            None => DayModel::Zero,
        }
    }

    /// Tier label for the whole forecast.
    ///
    /// `PerWeekday` when any weekday has its own fit, else `Pooled` when the
    /// pooled fit succeeded, else `FlatFallback`.
    pub fn tier(&self) -> ModelTier {
        if self.weekday.iter().any(Option::is_some) {
            ModelTier::PerWeekday
        } else if self.pooled.is_some() {
            ModelTier::Pooled
        } else {
            ModelTier::FlatFallback
        }
    }

    /// Arithmetic mean of all raw daily totals
    pub fn overall_mean(&self) -> f64 {
        self.overall_mean
    }

    pub fn days_of_history(&self) -> usize {
        self.days_of_history
    }

    pub fn has_history(&self) -> bool {
        self.days_of_history > 0
    }

    pub fn weekday_estimate(&self, weekday: Weekday) -> Option<SpendEstimate> {
        self.weekday[weekday.num_days_from_monday() as usize]
    }

    pub fn pooled_estimate(&self) -> Option<SpendEstimate> {
        self.pooled
    }
}

/// Chooses per-weekday, pooled or flat models for a spend history
#[derive(Debug, Clone, Default)]
pub struct WeekdayModelSelector {
    fitter: DistributionFitter,
    config: WeekdayConfig,
}

impl WeekdayModelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(fitter: DistributionFitter, config: WeekdayConfig) -> Self {
        Self { fitter, config }
    }

    pub fn select(&self, daily: &DailySpendMap) -> WeekdayModels {
        let mut buckets: [Vec<f64>; 7] = Default::default();
        for (date, spend) in daily.iter() {
            buckets[date.weekday().num_days_from_monday() as usize].push(spend);
        }

        let all_values = daily.values();
        let overall_mean = daily.mean();
        let pooled = self.fitter.fit_estimate(&all_values);

        let mut weekday = [None; 7];
        for (idx, bucket) in buckets.iter().enumerate() {
            if bucket.len() < self.config.min_samples_per_weekday {
                continue;
            }
            weekday[idx] = self.fitter.fit_estimate(bucket);
            debug!(
                "Weekday {} ({} samples): {}",
                idx,
                bucket.len(),
                if weekday[idx].is_some() {
                    "fitted"
                } else {
                    "fit failed, using fallback"
                }
            );
        }

        let flat = (!daily.is_empty()).then(|| {
            SpendEstimate::flat(
                overall_mean,
                self.config.flat_low_factor,
                self.config.flat_high_factor,
            )
        });

        debug!(
            "Pooled fit over {} days: {}",
            all_values.len(),
            if pooled.is_some() { "fitted" } else { "failed" }
        );

        WeekdayModels {
            weekday,
            pooled,
            flat,
            overall_mean,
            days_of_history: daily.len(),
        }
    }
}
