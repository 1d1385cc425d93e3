//! Spendcast Core Library
//!
//! Forecasts day-by-day discretionary spending from transaction history:
//! - Transaction classification (income, known obligations, gap-regular debits)
//! - Daily aggregation of irregular spend
//! - Gamma distribution fitting with outlier trimming
//! - Per-weekday / pooled / flat model selection
//! - Payday effect detection
//! - Forecast generation with percentile bounds
//! - Request validation, CSV history import and tuning config

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod fit;
pub mod forecast;
pub mod import;
pub mod models;
pub mod payday;
pub mod request;
pub mod weekday;

pub use aggregate::DailySpendMap;
pub use classify::{classify, Classification, TransactionClassifier};
pub use config::{load_config, ConfigSource, ForecastConfig, LoadedConfig};
pub use error::{Error, Result};
pub use fit::{DistributionFitter, GammaModel, SpendEstimate};
pub use forecast::{forecast, forecast_report, ForecastReport, SpendingForecaster};
pub use models::{DailyForecast, ModelTier, Obligation, Transaction};
pub use payday::{PaydayEffectEstimator, PaydayProfile};
pub use request::{ForecastRequest, ValidatedRequest};
pub use weekday::{DayModel, WeekdayModelSelector, WeekdayModels};
