use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use thiserror::Error;

use printquote_core::domain::catalog::{
    Material, MaterialInput, NewShippingRate, PackagingRate, PackagingRateInput, RateConfig,
    ShippingRate,
};
use printquote_core::domain::quote::{NewQuote, QuoteDetail, QuoteId, QuoteSummary};
use printquote_core::errors::{ApplicationError, DomainError, Entity};
use printquote_core::snapshot::SnapshotError;
use printquote_core::validation::{ValidationError, ValidationReason};

pub mod catalog;
pub mod memory;
pub mod quote;
pub mod rates;

pub use catalog::SqlCatalogRepository;
pub use memory::{InMemoryCatalogRepository, InMemoryQuoteRepository, InMemoryRateConfigRepository};
pub use quote::SqlQuoteRepository;
pub use rates::SqlRateConfigRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },
    #[error("{field} already exists")]
    Duplicate { field: &'static str },
    #[error("constraint violation: {0}")]
    Constraint(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { entity, id } => {
                ApplicationError::Domain(DomainError::NotFound { entity, id })
            }
            RepositoryError::Duplicate { field } => ApplicationError::Domain(
                DomainError::Validation(ValidationError::new(field, ValidationReason::Duplicate)),
            ),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Saved quotes. A quote is written once with all of its line items and never
/// updated afterwards.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn create(&self, quote: NewQuote) -> Result<QuoteId, RepositoryError>;
    async fn find_detail(&self, id: QuoteId) -> Result<Option<QuoteDetail>, RepositoryError>;
    /// Newest first. A blank `search` lists everything; otherwise title or notes
    /// must contain it as a case-sensitive substring.
    async fn list(&self, search: &str) -> Result<Vec<QuoteSummary>, RepositoryError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_active_material(&self, id: i64) -> Result<Option<Material>, RepositoryError>;
    async fn find_active_shipping_rate(
        &self,
        id: i64,
    ) -> Result<Option<ShippingRate>, RepositoryError>;
    async fn find_active_packaging_rate(
        &self,
        id: i64,
    ) -> Result<Option<PackagingRate>, RepositoryError>;

    async fn list_materials(&self, active_only: bool) -> Result<Vec<Material>, RepositoryError>;
    async fn create_material(&self, input: MaterialInput) -> Result<Material, RepositoryError>;
    async fn update_material(
        &self,
        id: i64,
        input: MaterialInput,
    ) -> Result<Material, RepositoryError>;

    async fn list_shipping_rates(
        &self,
        active_only: bool,
    ) -> Result<Vec<ShippingRate>, RepositoryError>;
    async fn create_shipping_rate(
        &self,
        input: NewShippingRate,
    ) -> Result<ShippingRate, RepositoryError>;
    async fn update_shipping_rate(
        &self,
        id: i64,
        input: NewShippingRate,
    ) -> Result<ShippingRate, RepositoryError>;

    async fn list_packaging_rates(
        &self,
        active_only: bool,
    ) -> Result<Vec<PackagingRate>, RepositoryError>;
    async fn create_packaging_rate(
        &self,
        input: PackagingRateInput,
    ) -> Result<PackagingRate, RepositoryError>;
    async fn update_packaging_rate(
        &self,
        id: i64,
        input: PackagingRateInput,
    ) -> Result<PackagingRate, RepositoryError>;
}

#[async_trait]
pub trait RateConfigRepository: Send + Sync {
    /// Creates the all-zero singleton on first use.
    async fn ensure(&self) -> Result<(), RepositoryError>;
    async fn get(&self) -> Result<RateConfig, RepositoryError>;
    async fn update(&self, config: RateConfig) -> Result<RateConfig, RepositoryError>;
}

pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get(column)?;
    parse_decimal(column, &raw)
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(|err| RepositoryError::Decode(format!("invalid {column} value '{raw}': {err}")))
}

pub(crate) fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn bool_flag(field: &str, raw: i64) -> Result<bool, RepositoryError> {
    match raw {
        0 => Ok(false),
        1 => Ok(true),
        raw => Err(RepositoryError::Decode(format!("invalid {field} flag: {raw}"))),
    }
}

pub(crate) fn map_unique_violation(error: sqlx::Error, field: &'static str) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            RepositoryError::Duplicate { field }
        }
        _ => RepositoryError::Database(error),
    }
}
