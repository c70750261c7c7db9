//! Input checks applied before anything reaches the pricing engine or storage.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// Largest magnitude accepted for any amount, rate, weight, duration or quantity.
pub const MAX_MAGNITUDE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self { field: field.into(), reason }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidationReason {
    #[error("must be numeric")]
    NotNumeric,
    #[error("must be greater than or equal to 0")]
    Negative,
    #[error("must be greater than 0")]
    NotPositive,
    #[error("must be at most 1000000000")]
    TooLarge,
    #[error("must be between 0 and 100")]
    PercentOutOfRange,
    #[error("must be a positive id")]
    InvalidId,
    #[error("is required")]
    Required,
    #[error("must be CO or INTL")]
    InvalidShippingScope,
    #[error("already exists")]
    Duplicate,
}

pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, ValidationError> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| ValidationError::new(field, ValidationReason::NotNumeric))
}

pub fn non_negative(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new(field, ValidationReason::Negative));
    }
    bounded(field, value)
}

pub fn positive(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::new(field, ValidationReason::NotPositive));
    }
    bounded(field, value)
}

pub fn bounded(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value.abs() > MAX_MAGNITUDE {
        return Err(ValidationError::new(field, ValidationReason::TooLarge));
    }
    Ok(value)
}

pub fn percent(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    let value = non_negative(field, value)?;
    if value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new(field, ValidationReason::PercentOutOfRange));
    }
    Ok(value)
}

pub fn required_id(field: &str, value: i64) -> Result<i64, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::new(field, ValidationReason::InvalidId));
    }
    Ok(value)
}

/// `None` and `Some(0)` both mean "no selection".
pub fn optional_id(field: &str, value: Option<i64>) -> Result<Option<i64>, ValidationError> {
    match value {
        None | Some(0) => Ok(None),
        Some(id) => required_id(field, id).map(Some),
    }
}

pub fn required_text(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::new(field, ValidationReason::Required));
    }
    Ok(value.to_string())
}

/// Trims free text; blank input becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
