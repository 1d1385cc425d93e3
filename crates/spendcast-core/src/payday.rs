//! Payday effect estimation
//!
//! Large inflows mark paydays. The modal day-of-month of those inflows becomes
//! the expected payday, and irregular spend on the two days after each observed
//! payday is compared against the overall daily mean to get a multiplier.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::DailySpendMap;
use crate::config::PaydayConfig;
use crate::models::Transaction;

/// Detected payday and the spend multiplier applied after it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaydayProfile {
    /// `None` when no inflow reached the income threshold
    pub day_of_month: Option<u32>,
    /// 1.0 when there is too little post-payday evidence
    pub multiplier: f64,
}

impl PaydayProfile {
    pub fn none() -> Self {
        Self {
            day_of_month: None,
            multiplier: 1.0,
        }
    }

    /// Scale factor for a forecast date.
    ///
    /// One day after this month's payday gets the full multiplier, two days
    /// after gets `multiplier * secondary_decay`. Months without the payday
    /// (e.g. the 30th in February) are left alone, as is every other day.
    pub fn factor_for(&self, date: NaiveDate, secondary_decay: f64) -> f64 {
        let Some(day) = self.day_of_month else {
            return 1.0;
        };
        let Some(this_payday) = NaiveDate::from_ymd_opt(date.year(), date.month(), day) else {
            return 1.0;
        };
        match (date - this_payday).num_days() {
            1 => self.multiplier,
            2 => self.multiplier * secondary_decay,
            _ => 1.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.day_of_month.is_some() && self.multiplier != 1.0
    }
}

impl Default for PaydayProfile {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaydayEffectEstimator {
    config: PaydayConfig,
}

impl PaydayEffectEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PaydayConfig) -> Self {
        Self { config }
    }

    /// Estimate the payday profile.
    ///
    /// `transactions` is the full history (inflows included), `daily` the
    /// irregular spend totals and `overall_mean` their mean.
    pub fn estimate(
        &self,
        transactions: &[Transaction],
        daily: &DailySpendMap,
        overall_mean: f64,
    ) -> PaydayProfile {
        let paydays: Vec<NaiveDate> = transactions
            .iter()
            .filter(|tx| tx.amount >= self.config.income_threshold)
            .map(|tx| tx.booked_at)
            .collect();

        let Some(day_of_month) = modal_day_of_month(&paydays) else {
            return PaydayProfile::none();
        };

        let unique_paydays: BTreeSet<NaiveDate> = paydays.into_iter().collect();
        let samples: Vec<f64> = unique_paydays
            .iter()
            .flat_map(|payday| [1, 2].map(|offset| payday.checked_add_days(Days::new(offset))))
            .flatten()
            .filter_map(|date| daily.get(date))
            .collect();

        if samples.len() < self.config.min_samples || overall_mean <= 0.0 {
            debug!(
                "Payday on day {} but only {} post-payday samples, no multiplier",
                day_of_month,
                samples.len()
            );
            return PaydayProfile {
                day_of_month: Some(day_of_month),
                multiplier: 1.0,
            };
        }

        let sample_mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let multiplier = (sample_mean / overall_mean).min(self.config.max_multiplier);
        debug!(
            "Payday on day {}: {} samples, multiplier {:.3}",
            day_of_month,
            samples.len(),
            multiplier
        );

        PaydayProfile {
            day_of_month: Some(day_of_month),
            multiplier,
        }
    }
}

/// Most frequent day-of-month; ties go to the day seen first
fn modal_day_of_month(dates: &[NaiveDate]) -> Option<u32> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    let mut order: Vec<u32> = Vec::new();
    for date in dates {
        let count = counts.entry(date.day()).or_insert(0);
        if *count == 0 {
            order.push(date.day());
        }
        *count += 1;
    }

    let mut best: Option<(u32, usize)> = None;
    for day in order {
        let count = counts.get(&day).copied().unwrap_or(0);
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((day, count));
        }
    }
    best.map(|(day, _)| day)
}
