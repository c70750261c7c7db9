use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError, ValidationReason};

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub cost_per_kg: Decimal,
    pub notes: Option<String>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialInput {
    pub name: String,
    pub cost_per_kg: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl MaterialInput {
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: validation::required_text("name", &self.name)?,
            cost_per_kg: validation::positive("cost_per_kg", self.cost_per_kg)?,
            notes: validation::optional_text(self.notes.as_deref()),
            active: self.active,
        })
    }
}

/// `City` only appears on seeded rows; admin input accepts `CO` and `INTL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingScope {
    #[serde(rename = "CO")]
    Domestic,
    #[serde(rename = "INTL")]
    International,
    #[serde(rename = "CITY")]
    City,
}

impl ShippingScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domestic => "CO",
            Self::International => "INTL",
            Self::City => "CITY",
        }
    }

    pub fn parse_stored(value: &str) -> Option<Self> {
        match value {
            "CO" => Some(Self::Domestic),
            "INTL" => Some(Self::International),
            "CITY" => Some(Self::City),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub id: i64,
    pub scope: ShippingScope,
    pub country: String,
    pub city: Option<String>,
    pub flat_cost: Decimal,
    pub notes: Option<String>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRateInput {
    pub scope: String,
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
    pub flat_cost: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewShippingRate {
    pub scope: ShippingScope,
    pub country: String,
    pub city: Option<String>,
    pub flat_cost: Decimal,
    pub notes: Option<String>,
    pub active: bool,
}

impl ShippingRateInput {
    pub fn validated(self) -> Result<NewShippingRate, ValidationError> {
        let scope = match self.scope.trim() {
            "CO" => ShippingScope::Domestic,
            "INTL" => ShippingScope::International,
            _ => return Err(ValidationError::new("scope", ValidationReason::InvalidShippingScope)),
        };

        Ok(NewShippingRate {
            scope,
            country: validation::required_text("country", &self.country)?,
            city: validation::optional_text(self.city.as_deref()),
            flat_cost: validation::non_negative("flat_cost", self.flat_cost)?,
            notes: validation::optional_text(self.notes.as_deref()),
            active: self.active,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingRate {
    pub id: i64,
    pub name: String,
    pub flat_cost: Decimal,
    pub notes: Option<String>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingRateInput {
    pub name: String,
    pub flat_cost: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl PackagingRateInput {
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: validation::required_text("name", &self.name)?,
            flat_cost: validation::non_negative("flat_cost", self.flat_cost)?,
            notes: validation::optional_text(self.notes.as_deref()),
            active: self.active,
        })
    }
}

pub const DEFAULT_CURRENCY: &str = "COP";

/// Shop-wide rates. There is exactly one row; it is created on first read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateConfig {
    pub machine_hourly_rate: Decimal,
    pub labor_per_minute: Decimal,
    pub overhead_fixed: Decimal,
    pub overhead_percent: Decimal,
    pub failure_rate_percent: Decimal,
    pub tax_percent: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            machine_hourly_rate: Decimal::ZERO,
            labor_per_minute: Decimal::ZERO,
            overhead_fixed: Decimal::ZERO,
            overhead_percent: Decimal::ZERO,
            failure_rate_percent: Decimal::ZERO,
            tax_percent: Decimal::ZERO,
            currency: default_currency(),
            updated_at: None,
        }
    }
}

impl RateConfig {
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            machine_hourly_rate: validation::non_negative(
                "machine_hourly_rate",
                self.machine_hourly_rate,
            )?,
            labor_per_minute: validation::non_negative("labor_per_minute", self.labor_per_minute)?,
            overhead_fixed: validation::non_negative("overhead_fixed", self.overhead_fixed)?,
            overhead_percent: validation::percent("overhead_percent", self.overhead_percent)?,
            failure_rate_percent: validation::percent(
                "failure_rate_percent",
                self.failure_rate_percent,
            )?,
            tax_percent: validation::percent("tax_percent", self.tax_percent)?,
            currency: validation::required_text("currency", &self.currency)?.to_ascii_uppercase(),
            updated_at: self.updated_at,
        })
    }
}
