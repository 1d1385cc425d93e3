//! Transaction classification
//!
//! Separates a transaction history into income, recurring obligations and
//! irregular discretionary spend. Rules are evaluated in a fixed order and the
//! first one that matches decides:
//! 1. amount >= 0                          → income
//! 2. normalized key matches an obligation → recurring (known bill)
//! 3. key repeats with regular day gaps    → recurring (derived)
//! 4. everything else                      → irregular
//!
//! The gap test looks at a key across the whole history, so a handful of
//! evenly spaced one-off purchases at a generic merchant will be treated as
//! recurring. That false-positive mode is a known property of the heuristic.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::models::{Obligation, Transaction};

/// Outcome of classifying a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Income,
    /// Matched a known obligation merchant
    Obligation,
    /// Repeats with regular day gaps
    GapRecurring,
    Irregular,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Obligation => "obligation",
            Self::GapRecurring => "gap_recurring",
            Self::Irregular => "irregular",
        }
    }

    pub fn is_irregular(&self) -> bool {
        matches!(self, Self::Irregular)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys derived from the whole history, shared by every rule
struct RuleContext {
    obligation_keys: HashSet<String>,
    recurring_keys: HashSet<String>,
}

/// An exclusion rule: returns the classification if it claims the transaction
type Rule = fn(&Transaction, &str, &RuleContext) -> Option<Classification>;

/// Exclusion rules in evaluation order
const RULES: [Rule; 3] = [income_rule, obligation_rule, gap_recurring_rule];

fn income_rule(tx: &Transaction, _key: &str, _ctx: &RuleContext) -> Option<Classification> {
    (!tx.is_outflow()).then_some(Classification::Income)
}

fn obligation_rule(_tx: &Transaction, key: &str, ctx: &RuleContext) -> Option<Classification> {
    ctx.obligation_keys
        .contains(key)
        .then_some(Classification::Obligation)
}

fn gap_recurring_rule(_tx: &Transaction, key: &str, ctx: &RuleContext) -> Option<Classification> {
    ctx.recurring_keys
        .contains(key)
        .then_some(Classification::GapRecurring)
}

/// Classifies transactions as income, recurring or irregular
#[derive(Debug, Clone, Default)]
pub struct TransactionClassifier {
    config: ClassifierConfig,
}

impl TransactionClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Return only the irregular outgoing transactions, in input order
    pub fn classify<'t>(
        &self,
        transactions: &'t [Transaction],
        obligations: &[Obligation],
    ) -> Vec<&'t Transaction> {
        let labels = self.label_all(transactions, obligations);
        let irregular: Vec<&Transaction> = transactions
            .iter()
            .zip(labels)
            .filter(|(_, label)| label.is_irregular())
            .map(|(tx, _)| tx)
            .collect();

        debug!(
            "Classified {} of {} transactions as irregular",
            irregular.len(),
            transactions.len()
        );
        irregular
    }

    /// Label every transaction, parallel to the input slice
    pub fn label_all(
        &self,
        transactions: &[Transaction],
        obligations: &[Obligation],
    ) -> Vec<Classification> {
        let key_chars = self.config.description_key_chars;
        let keys: Vec<String> = transactions
            .iter()
            .map(|tx| tx.normalized_key(key_chars))
            .collect();

        let obligation_keys: HashSet<String> =
            obligations.iter().filter_map(Obligation::key).collect();
        let recurring_keys = self.recurring_keys(transactions, &keys, &obligation_keys);

        if !recurring_keys.is_empty() {
            debug!(
                "Gap regularity marked {} keys as recurring",
                recurring_keys.len()
            );
        }

        let ctx = RuleContext {
            obligation_keys,
            recurring_keys,
        };

        transactions
            .iter()
            .zip(&keys)
            .map(|(tx, key)| {
                RULES
                    .iter()
                    .find_map(|rule| rule(tx, key.as_str(), &ctx))
                    .unwrap_or(Classification::Irregular)
            })
            .collect()
    }

    /// Keys whose outgoing occurrences are spaced regularly enough to be bills
    fn recurring_keys(
        &self,
        transactions: &[Transaction],
        keys: &[String],
        obligation_keys: &HashSet<String>,
    ) -> HashSet<String> {
        let mut dates_by_key: HashMap<&str, Vec<NaiveDate>> = HashMap::new();
        for (tx, key) in transactions.iter().zip(keys) {
            // Keyless debits have nothing to group on
            if !tx.is_outflow() || key.is_empty() || obligation_keys.contains(key) {
                continue;
            }
            dates_by_key.entry(key.as_str()).or_default().push(tx.booked_at);
        }

        dates_by_key
            .into_iter()
            .filter(|(_, dates)| dates.len() >= self.config.min_recurring_matches)
            .filter_map(|(key, mut dates)| {
                dates.sort();
                let cv = gap_coefficient_of_variation(&dates)?;
                (cv < self.config.recurring_cv_threshold).then(|| key.to_string())
            })
            .collect()
    }
}

/// Coefficient of variation of the day gaps between sorted dates.
///
/// Uses the population standard deviation. Returns `None` with fewer than two
/// dates and infinity when the mean gap is zero (all on the same day).
pub fn gap_coefficient_of_variation(sorted_dates: &[NaiveDate]) -> Option<f64> {
    let gaps: Vec<f64> = sorted_dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();

    if gaps.is_empty() {
        return None;
    }

    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if mean <= 0.0 {
        return Some(f64::INFINITY);
    }

    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
    Some(variance.sqrt() / mean)
}

/// Classify with the default configuration
pub fn classify<'t>(
    transactions: &'t [Transaction],
    obligations: &[Obligation],
) -> Vec<&'t Transaction> {
    TransactionClassifier::new().classify(transactions, obligations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days_ago(days: i64) -> NaiveDate {
        date(2026, 1, 31) - Duration::days(days)
    }

    #[test]
    fn test_income_excluded() {
        let txns = vec![Transaction::new(2500.0, days_ago(5)).with_description("Salary")];
        assert!(classify(&txns, &[]).is_empty());
    }

    #[test]
    fn test_zero_amount_is_income() {
        let txns = vec![Transaction::new(0.0, days_ago(5)).with_description("Refund")];
        let labels = TransactionClassifier::new().label_all(&txns, &[]);
        assert_eq!(labels, vec![Classification::Income]);
    }

    #[test]
    fn test_obligation_case_insensitive() {
        let obligations = vec![Obligation::new("Netflix")];
        let txns = vec![
            Transaction::new(-15.99, days_ago(10))
                .with_merchant("netflix")
                .with_description("Netflix"),
            Transaction::new(-15.99, days_ago(40))
                .with_merchant("NETFLIX")
                .with_description("Netflix Sub"),
        ];
        assert!(classify(&txns, &obligations).is_empty());
    }

    #[test]
    fn test_obligation_matches_description_key() {
        let obligations = vec![Obligation::new("Council Tax")];
        let txns = vec![Transaction::new(-120.0, days_ago(3)).with_description("  COUNCIL TAX ")];
        let labels = TransactionClassifier::new().label_all(&txns, &obligations);
        assert_eq!(labels, vec![Classification::Obligation]);
    }

    #[test]
    fn test_weekly_merchant_is_gap_recurring() {
        let txns: Vec<Transaction> = (1..10)
            .map(|i| {
                Transaction::new(-4.50, days_ago(7 * i))
                    .with_merchant("starbucks")
                    .with_description("Starbucks coffee")
            })
            .collect();
        let labels = TransactionClassifier::new().label_all(&txns, &[]);
        assert!(labels.iter().all(|l| *l == Classification::GapRecurring));
        assert!(classify(&txns, &[]).is_empty());
    }

    #[test]
    fn test_jittery_monthly_is_recurring() {
        let txns: Vec<Transaction> = [
            date(2025, 10, 2),
            date(2025, 11, 1),
            date(2025, 12, 2),
            date(2026, 1, 1),
        ]
        .into_iter()
        .map(|d| Transaction::new(-9.99, d).with_merchant("spotify"))
        .collect();
        assert!(classify(&txns, &[]).is_empty());
    }

    #[test]
    fn test_erratic_gaps_stay_irregular() {
        let txns: Vec<Transaction> = [
            date(2025, 11, 1),
            date(2025, 11, 5),
            date(2025, 12, 10),
            date(2026, 1, 30),
        ]
        .into_iter()
        .map(|d| Transaction::new(-20.0, d).with_description("random store"))
        .collect();
        assert_eq!(classify(&txns, &[]).len(), 4);
    }

    #[test]
    fn test_one_off_is_irregular() {
        let txns = vec![Transaction::new(-250.0, days_ago(3))
            .with_merchant("apple store")
            .with_description("iPhone case")];
        assert_eq!(classify(&txns, &[]).len(), 1);
    }

    #[test]
    fn test_same_day_duplicates_never_recurring() {
        let txns = vec![
            Transaction::new(-3.0, days_ago(2)).with_merchant("vending"),
            Transaction::new(-3.0, days_ago(2)).with_merchant("vending"),
            Transaction::new(-3.0, days_ago(2)).with_merchant("vending"),
        ];
        assert_eq!(classify(&txns, &[]).len(), 3);
    }

    #[test]
    fn test_keyless_debits_are_irregular() {
        let txns: Vec<Transaction> = (1..5)
            .map(|i| Transaction::new(-10.0, days_ago(7 * i)))
            .collect();
        assert_eq!(classify(&txns, &[]).len(), 4);
    }

    #[test]
    fn test_whitespace_obligation_claims_keyless_debits() {
        let txns = vec![
            Transaction::new(-10.0, days_ago(3)),
            Transaction::new(-12.0, days_ago(9)).with_description("Corner shop"),
        ];
        let labels = TransactionClassifier::new().label_all(&txns, &[Obligation::new("  ")]);
        assert_eq!(labels, vec![Classification::Obligation, Classification::Irregular]);

        let labels = TransactionClassifier::new().label_all(&txns, &[Obligation::new("")]);
        assert_eq!(labels, vec![Classification::Irregular, Classification::Irregular]);
    }

    #[test]
    fn test_mixed_batch_separation() {
        let mut txns = vec![
            Transaction::new(2500.0, days_ago(30)).with_description("Salary"),
            Transaction::new(-15.99, days_ago(30))
                .with_merchant("netflix")
                .with_description("Netflix"),
            Transaction::new(-15.99, days_ago(60))
                .with_merchant("netflix")
                .with_description("Netflix"),
        ];
        txns.extend((1..5).map(|k| {
            Transaction::new(-35.0, days_ago(28 * k))
                .with_merchant("gym")
                .with_description("Gym")
        }));
        txns.push(
            Transaction::new(-42.0, days_ago(5))
                .with_merchant("amazon")
                .with_description("Amazon order"),
        );
        txns.push(Transaction::new(-18.5, days_ago(2)).with_description("Just Eat order"));

        let irregular = classify(&txns, &[Obligation::new("Netflix")]);
        let keys: Vec<String> = irregular.iter().map(|t| t.normalized_key(30)).collect();
        assert_eq!(keys, vec!["amazon", "just eat order"]);
    }

    #[test]
    fn test_custom_threshold() {
        // Gaps 7, 10, 7: cv ≈ 0.18
        let txns: Vec<Transaction> = [days_ago(24), days_ago(17), days_ago(7), days_ago(0)]
            .into_iter()
            .map(|d| Transaction::new(-8.0, d).with_merchant("market"))
            .collect();
        assert!(classify(&txns, &[]).is_empty());

        let strict = TransactionClassifier::with_config(ClassifierConfig {
            recurring_cv_threshold: 0.1,
            ..Default::default()
        });
        assert_eq!(strict.classify(&txns, &[]).len(), 4);
    }

    #[test]
    fn test_cv_at_threshold_stays_irregular() {
        // Gaps 4 and 12 give a CV of exactly 0.5
        let txns: Vec<Transaction> = [date(2026, 1, 1), date(2026, 1, 5), date(2026, 1, 17)]
            .into_iter()
            .map(|d| Transaction::new(-15.0, d).with_merchant("bookshop"))
            .collect();
        let labels = TransactionClassifier::new().label_all(&txns, &[]);
        assert_eq!(labels, vec![Classification::Irregular; 3]);
        assert_eq!(classify(&txns, &[]).len(), 3);
    }

    #[test]
    fn test_gap_cv() {
        assert_eq!(gap_coefficient_of_variation(&[date(2026, 1, 1)]), None);
        assert_eq!(
            gap_coefficient_of_variation(&[date(2026, 1, 1), date(2026, 1, 8), date(2026, 1, 15)]),
            Some(0.0)
        );
        assert_eq!(
            gap_coefficient_of_variation(&[date(2026, 1, 1), date(2026, 1, 1)]),
            Some(f64::INFINITY)
        );
        // Gaps 4 and 12: mean 8, std 4
        let cv = gap_coefficient_of_variation(&[date(2026, 1, 1), date(2026, 1, 5), date(2026, 1, 17)])
            .unwrap();
        assert!((cv - 0.5).abs() < 1e-12);
    }
}
