//! JSON request boundary
//!
//! Decodes a forecast request, fills defaults and enforces the input contract
//! before anything reaches the engine.

use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ForecastConfig;
use crate::error::{Error, Result};
use crate::forecast::{ForecastReport, SpendingForecaster};
use crate::models::{Obligation, Transaction};

/// Forecast request as received on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
    /// ISO date; defaults to the caller's notion of today
    #[serde(default)]
    pub forecast_start: Option<String>,
    /// Signed so out-of-range values surface as contract errors
    #[serde(default)]
    pub horizon_days: Option<i64>,
}

/// A request whose every field is present and in range
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub transactions: Vec<Transaction>,
    pub obligations: Vec<Obligation>,
    pub forecast_start: NaiveDate,
    pub horizon_days: u32,
}

impl ForecastRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Fill defaults and check limits.
    ///
    /// `today` is used when no `forecast_start` was given.
    pub fn validate(self, today: NaiveDate, config: &ForecastConfig) -> Result<ValidatedRequest> {
        let limits = &config.horizon;

        if self.transactions.is_empty() {
            return Err(Error::InvalidInput(
                "At least one transaction is required".to_string(),
            ));
        }
        if self.transactions.len() > limits.max_transactions {
            return Err(Error::InvalidInput(format!(
                "Too many transactions: {} (limit {})",
                self.transactions.len(),
                limits.max_transactions
            )));
        }
        if let Some(tx) = self.transactions.iter().find(|tx| !tx.amount.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Transaction on {} has a non-finite amount",
                tx.booked_at
            )));
        }

        let horizon = self.horizon_days.unwrap_or(i64::from(limits.default_days));
        if horizon < 1 || horizon > i64::from(limits.max_days) {
            return Err(Error::InvalidInput(format!(
                "horizon_days must be between 1 and {}, got {}",
                limits.max_days, horizon
            )));
        }

        let forecast_start = match self.forecast_start.as_deref() {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                Error::InvalidInput(format!(
                    "forecast_start must be an ISO date (YYYY-MM-DD), got '{}'",
                    raw
                ))
            })?,
            None => today,
        };

        Ok(ValidatedRequest {
            transactions: self.transactions,
            obligations: self.obligations,
            forecast_start,
            horizon_days: horizon as u32,
        })
    }
}

impl ValidatedRequest {
    pub fn run(&self, forecaster: &SpendingForecaster) -> Result<ForecastReport> {
        forecaster.forecast_report(
            &self.transactions,
            &self.obligations,
            self.forecast_start,
            self.horizon_days,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &str = r#"{
        "transactions": [
            {"amount": -12.5, "booked_at": "2026-01-03", "merchant_name": "cafe"},
            {"amount": -80.0, "booked_at": "2026-01-05T18:00:00+00:00", "merchant_name": "Netflix"},
            {"amount": 2500.0, "booked_at": "2026-01-25", "description": "Salary"}
        ],
        "obligations": [{"merchant_name": "netflix"}],
        "forecast_start": "2026-02-01",
        "horizon_days": 7
    }"#;

    #[test]
    fn test_decode_and_validate() {
        let req = ForecastRequest::from_json(SAMPLE).unwrap();
        let valid = req
            .validate(date(2026, 1, 30), &ForecastConfig::default())
            .unwrap();
        assert_eq!(valid.transactions.len(), 3);
        assert_eq!(valid.obligations, vec![Obligation::new("netflix")]);
        assert_eq!(valid.forecast_start, date(2026, 2, 1));
        assert_eq!(valid.horizon_days, 7);
        assert_eq!(valid.transactions[1].booked_at, date(2026, 1, 5));
    }

    #[test]
    fn test_defaults_filled() {
        let req = ForecastRequest::from_json(
            r#"{"transactions": [{"amount": -3.0, "booked_at": "2026-01-03"}]}"#,
        )
        .unwrap();
        let valid = req
            .validate(date(2026, 3, 9), &ForecastConfig::default())
            .unwrap();
        assert_eq!(valid.forecast_start, date(2026, 3, 9));
        assert_eq!(valid.horizon_days, 30);
        assert!(valid.obligations.is_empty());
    }

    #[test]
    fn test_rejects_empty_transactions() {
        let req = ForecastRequest::default();
        let err = req
            .validate(date(2026, 1, 1), &ForecastConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_too_many_transactions() {
        let mut config = ForecastConfig::default();
        config.horizon.max_transactions = 2;
        let req = ForecastRequest::from_json(SAMPLE).unwrap();
        let err = req.validate(date(2026, 1, 1), &config).unwrap_err();
        assert!(err.to_string().contains("Too many transactions"));
    }

    #[test]
    fn test_rejects_horizon_out_of_range() {
        for horizon in [0, -5, 91] {
            let mut req = ForecastRequest::from_json(SAMPLE).unwrap();
            req.horizon_days = Some(horizon);
            assert!(
                req.validate(date(2026, 1, 1), &ForecastConfig::default())
                    .is_err(),
                "horizon {} should be rejected",
                horizon
            );
        }
    }

    #[test]
    fn test_rejects_malformed_start() {
        let mut req = ForecastRequest::from_json(SAMPLE).unwrap();
        req.forecast_start = Some("01/02/2026".to_string());
        let err = req
            .validate(date(2026, 1, 1), &ForecastConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("forecast_start"));
    }

    #[test]
    fn test_malformed_booked_at_is_decode_error() {
        let result = ForecastRequest::from_json(
            r#"{"transactions": [{"amount": -3.0, "booked_at": "yesterday"}]}"#,
        );
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_run_excludes_obligation() {
        let valid = ForecastRequest::from_json(SAMPLE)
            .unwrap()
            .validate(date(2026, 1, 30), &ForecastConfig::default())
            .unwrap();
        let report = valid.run(&SpendingForecaster::new()).unwrap();
        assert_eq!(report.irregular_txn_count, 1);
        assert_eq!(report.daily_forecasts.len(), 7);
        assert!(report.daily_forecasts.iter().all(|d| d.mean == 12.5));
    }
}
