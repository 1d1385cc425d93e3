//! Daily aggregation of irregular spend

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::Transaction;

/// Total irregular outflow per calendar day.
///
/// Sparse: only days with at least one irregular transaction are present.
/// Dates iterate in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySpendMap {
    totals: BTreeMap<NaiveDate, f64>,
}

impl DailySpendMap {
    /// Sum absolute amounts per booking date
    pub fn aggregate<'a, I>(irregular: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut totals = BTreeMap::new();
        for tx in irregular {
            *totals.entry(tx.booked_at).or_insert(0.0) += tx.amount.abs();
        }
        Self { totals }
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.totals.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.totals.iter().map(|(d, v)| (*d, *v))
    }

    pub fn values(&self) -> Vec<f64> {
        self.totals.values().copied().collect()
    }

    /// Arithmetic mean of the daily totals, 0 when empty
    pub fn mean(&self) -> f64 {
        if self.totals.is_empty() {
            return 0.0;
        }
        self.totals.values().sum::<f64>() / self.totals.len() as f64
    }
}
