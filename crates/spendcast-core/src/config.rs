//! Forecast tuning configuration
//!
//! Every heuristic threshold the engine uses lives here so it can be tuned
//! without a rebuild. The defaults reproduce the engine's reference behaviour.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, else the override in the data dir
//!    (~/.local/share/spendcast/config/forecast.toml)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/forecast.toml");

/// Transaction classification thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Gap coefficient of variation below which a repeated key is recurring
    pub recurring_cv_threshold: f64,
    /// Minimum occurrences of a key before the gap test applies
    pub min_recurring_matches: usize,
    /// Description characters used for the normalized key
    pub description_key_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            recurring_cv_threshold: 0.5,
            min_recurring_matches: 2,
            description_key_chars: 30,
        }
    }
}

/// Distribution fitting parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// Values above mean + sigma * std are trimmed before fitting
    pub outlier_sigma: f64,
    pub low_quantile: f64,
    pub high_quantile: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            outlier_sigma: 3.0,
            low_quantile: 0.10,
            high_quantile: 0.90,
        }
    }
}

/// Weekday model selection parameters
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayConfig {
    pub min_samples_per_weekday: usize,
    pub flat_low_factor: f64,
    pub flat_high_factor: f64,
}

impl Default for WeekdayConfig {
    fn default() -> Self {
        Self {
            min_samples_per_weekday: 4,
            flat_low_factor: 0.4,
            flat_high_factor: 2.0,
        }
    }
}

/// Payday effect parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PaydayConfig {
    /// Inflows at or above this amount count as paydays
    pub income_threshold: f64,
    pub max_multiplier: f64,
    /// Post-payday spend samples needed before applying a multiplier
    pub min_samples: usize,
    /// Fraction of the multiplier applied two days after payday
    pub secondary_decay: f64,
}

impl Default for PaydayConfig {
    fn default() -> Self {
        Self {
            income_threshold: 500.0,
            max_multiplier: 2.0,
            min_samples: 3,
            secondary_decay: 0.8,
        }
    }
}

/// Request limits
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonConfig {
    pub max_days: u32,
    pub default_days: u32,
    pub max_transactions: usize,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            max_days: 90,
            default_days: 30,
            max_transactions: 5000,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastConfig {
    pub classifier: ClassifierConfig,
    pub fitting: FitConfig,
    pub weekday: WeekdayConfig,
    pub payday: PaydayConfig,
    pub horizon: HorizonConfig,
}

impl ForecastConfig {
    /// Check that every value is usable by the engine
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidData(msg.to_string()));

        if !(self.classifier.recurring_cv_threshold > 0.0) {
            return invalid("classifier.recurring_cv_threshold must be positive");
        }
        if self.classifier.min_recurring_matches < 2 {
            return invalid("classifier.min_recurring_matches must be at least 2");
        }
        if self.classifier.description_key_chars == 0 {
            return invalid("classifier.description_key_chars must be positive");
        }

        if !(self.fitting.outlier_sigma > 0.0) {
            return invalid("fitting.outlier_sigma must be positive");
        }
        let in_unit = |q: f64| q > 0.0 && q < 1.0;
        if !in_unit(self.fitting.low_quantile) || !in_unit(self.fitting.high_quantile) {
            return invalid("fitting quantiles must lie strictly between 0 and 1");
        }
        if self.fitting.low_quantile >= self.fitting.high_quantile {
            return invalid("fitting.low_quantile must be below fitting.high_quantile");
        }

        if self.weekday.min_samples_per_weekday < 2 {
            return invalid("weekday.min_samples_per_weekday must be at least 2");
        }
        if !(self.weekday.flat_low_factor >= 0.0 && self.weekday.flat_low_factor <= 1.0) {
            return invalid("weekday.flat_low_factor must lie between 0 and 1");
        }
        if !(self.weekday.flat_high_factor >= 1.0) {
            return invalid("weekday.flat_high_factor must be at least 1");
        }

        if !(self.payday.income_threshold > 0.0) {
            return invalid("payday.income_threshold must be positive");
        }
        if !(self.payday.max_multiplier >= 1.0) {
            return invalid("payday.max_multiplier must be at least 1");
        }
        if !(self.payday.secondary_decay > 0.0 && self.payday.secondary_decay <= 1.0) {
            return invalid("payday.secondary_decay must lie in (0, 1]");
        }

        if self.horizon.max_days == 0 {
            return invalid("horizon.max_days must be positive");
        }
        if self.horizon.default_days == 0 || self.horizon.default_days > self.horizon.max_days {
            return invalid("horizon.default_days must lie in [1, horizon.max_days]");
        }
        if self.horizon.max_transactions == 0 {
            return invalid("horizon.max_transactions must be positive");
        }

        Ok(())
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Embedded,
    File(PathBuf),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded defaults"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Configuration together with its origin
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ForecastConfig,
    pub source: ConfigSource,
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("spendcast").join("config").join("forecast.toml"))
}

/// Load configuration (explicit path, then data dir override, then embedded)
///
/// An explicit path must exist; the data dir override is optional.
pub fn load_config(explicit_path: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(Error::InvalidData(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return load_file(path);
    }

    if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            return load_file(&default_path);
        }
    }

    Ok(LoadedConfig {
        config: parse_config(DEFAULT_CONFIG)?,
        source: ConfigSource::Embedded,
    })
}

fn load_file(path: &Path) -> Result<LoadedConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?;
    Ok(LoadedConfig {
        config: parse_config(&content)?,
        source: ConfigSource::File(path.to_path_buf()),
    })
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    classifier: Option<RawClassifier>,
    fitting: Option<RawFitting>,
    weekday: Option<RawWeekday>,
    payday: Option<RawPayday>,
    horizon: Option<RawHorizon>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClassifier {
    recurring_cv_threshold: Option<f64>,
    min_recurring_matches: Option<usize>,
    description_key_chars: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFitting {
    outlier_sigma: Option<f64>,
    low_quantile: Option<f64>,
    high_quantile: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeekday {
    min_samples_per_weekday: Option<usize>,
    flat_low_factor: Option<f64>,
    flat_high_factor: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPayday {
    income_threshold: Option<f64>,
    max_multiplier: Option<f64>,
    min_samples: Option<usize>,
    secondary_decay: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHorizon {
    max_days: Option<u32>,
    default_days: Option<u32>,
    max_transactions: Option<usize>,
}

/// Parse config from TOML content, filling gaps with defaults
pub fn parse_config(content: &str) -> Result<ForecastConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

    let mut config = ForecastConfig::default();

    if let Some(c) = raw.classifier {
        if let Some(v) = c.recurring_cv_threshold {
            config.classifier.recurring_cv_threshold = v;
        }
        if let Some(v) = c.min_recurring_matches {
            config.classifier.min_recurring_matches = v;
        }
        if let Some(v) = c.description_key_chars {
            config.classifier.description_key_chars = v;
        }
    }

    if let Some(f) = raw.fitting {
        if let Some(v) = f.outlier_sigma {
            config.fitting.outlier_sigma = v;
        }
        if let Some(v) = f.low_quantile {
            config.fitting.low_quantile = v;
        }
        if let Some(v) = f.high_quantile {
            config.fitting.high_quantile = v;
        }
    }

    if let Some(w) = raw.weekday {
        if let Some(v) = w.min_samples_per_weekday {
            config.weekday.min_samples_per_weekday = v;
        }
        if let Some(v) = w.flat_low_factor {
            config.weekday.flat_low_factor = v;
        }
        if let Some(v) = w.flat_high_factor {
            config.weekday.flat_high_factor = v;
        }
    }

    if let Some(p) = raw.payday {
        if let Some(v) = p.income_threshold {
            config.payday.income_threshold = v;
        }
        if let Some(v) = p.max_multiplier {
            config.payday.max_multiplier = v;
        }
        if let Some(v) = p.min_samples {
            config.payday.min_samples = v;
        }
        if let Some(v) = p.secondary_decay {
            config.payday.secondary_decay = v;
        }
    }

    if let Some(h) = raw.horizon {
        if let Some(v) = h.max_days {
            config.horizon.max_days = v;
        }
        if let Some(v) = h.default_days {
            config.horizon.default_days = v;
        }
        if let Some(v) = h.max_transactions {
            config.horizon.max_transactions = v;
        }
    }

    config.validate()?;
    Ok(config)
}
