//! Domain models for spendcast

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// One booked transaction from the user's history.
///
/// Positive amounts are inflows, negative amounts are outflows. Records carry no
/// identity beyond their fields, so identical duplicates are legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: f64,
    /// Booking date. Accepts `YYYY-MM-DD` or an RFC 3339 timestamp on input.
    #[serde(deserialize_with = "deserialize_booked_at")]
    pub booked_at: NaiveDate,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(amount: f64, booked_at: NaiveDate) -> Self {
        Self {
            amount,
            booked_at,
            merchant_name: None,
            description: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant_name = Some(merchant.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true for money leaving the account
    pub fn is_outflow(&self) -> bool {
        self.amount < 0.0
    }

    /// Normalized lookup key used for obligation matching and gap regularity.
    ///
    /// The merchant name wins when present (lower-cased, trimmed). Otherwise the
    /// description is lower-cased, trimmed and cut to `description_chars`
    /// characters. Returns an empty string when neither exists.
    pub fn normalized_key(&self, description_chars: usize) -> String {
        match self.merchant_name.as_deref() {
            Some(merchant) if !merchant.is_empty() => merchant.to_lowercase().trim().to_string(),
            _ => self
                .description
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .trim()
                .chars()
                .take(description_chars)
                .collect(),
        }
    }
}

/// A merchant known to represent a recurring bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    pub merchant_name: String,
}

impl Obligation {
    pub fn new(merchant_name: impl Into<String>) -> Self {
        Self {
            merchant_name: merchant_name.into(),
        }
    }

    /// Case-insensitive match key, `None` only for an empty merchant.
    ///
    /// A whitespace-only merchant trims to `""` and so matches debits that
    /// carry neither merchant nor description.
    pub fn key(&self) -> Option<String> {
        if self.merchant_name.is_empty() {
            return None;
        }
        Some(self.merchant_name.to_lowercase().trim().to_string())
    }
}

/// Forecast for a single future day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Serialized as ISO `YYYY-MM-DD`
    pub date: NaiveDate,
    pub mean: f64,
    /// Low (optimistic) percentile estimate
    pub p10: f64,
    /// High (pessimistic) percentile estimate
    pub p90: f64,
}

impl DailyForecast {
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            mean: 0.0,
            p10: 0.0,
            p90: 0.0,
        }
    }
}

/// Which modelling strategy produced a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Gamma fit over the target weekday's own history
    PerWeekday,
    /// Gamma fit over every day of history
    Pooled,
    /// Mean of raw daily totals with fixed percentile factors
    FlatFallback,
    /// No spend history at all
    ExactZero,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerWeekday => "per_weekday",
            Self::Pooled => "pooled",
            Self::FlatFallback => "flat_fallback",
            Self::ExactZero => "exact_zero",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_weekday" => Ok(Self::PerWeekday),
            "pooled" => Ok(Self::Pooled),
            "flat_fallback" => Ok(Self::FlatFallback),
            "exact_zero" => Ok(Self::ExactZero),
            _ => Err(format!("Unknown model tier: {}", s)),
        }
    }
}

fn deserialize_booked_at<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_booked_at(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("Unable to parse booking date: {}", raw))
    })
}

/// Parse a booking date given either as a plain date or an RFC 3339 timestamp
pub fn parse_booked_at(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}
