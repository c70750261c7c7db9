use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::{Breakdown, PricingResult, Totals};
use crate::validation::{self, ValidationError, ValidationReason};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub i64);

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One printed part as submitted by a client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub material_id: i64,
    pub grams: Decimal,
    pub print_minutes: Decimal,
    pub labor_minutes: Decimal,
    pub quantity: Decimal,
}

impl QuoteItem {
    fn validated(self, index: usize) -> Result<Self, ValidationError> {
        let field = |name: &str| format!("items[{index}].{name}");
        Ok(Self {
            material_id: validation::required_id(&field("material_id"), self.material_id)?,
            grams: validation::positive(&field("grams"), self.grams)?,
            print_minutes: validation::non_negative(&field("print_minutes"), self.print_minutes)?,
            labor_minutes: validation::non_negative(&field("labor_minutes"), self.labor_minutes)?,
            quantity: validation::positive(&field("quantity"), self.quantity)?,
        })
    }
}

/// Calculation or save request. `tax_percent` falls back to the shop rate when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<QuoteItem>,
    pub waste_percent: Decimal,
    pub margin_percent: Decimal,
    #[serde(default)]
    pub tax_enabled: bool,
    #[serde(default)]
    pub tax_percent: Option<Decimal>,
    #[serde(default)]
    pub shipping_rate_id: Option<i64>,
    #[serde(default)]
    pub packaging_rate_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl QuoteRequest {
    /// Checks every field and returns the normalized request: ids of zero become
    /// `None` and blank title/notes are dropped.
    pub fn validated(self) -> Result<Self, ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::new("items", ValidationReason::Required));
        }

        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.validated(index))
            .collect::<Result<Vec<_>, _>>()?;

        let tax_percent = match self.tax_percent {
            Some(value) => Some(validation::percent("tax_percent", value)?),
            None => None,
        };

        Ok(Self {
            items,
            waste_percent: validation::percent("waste_percent", self.waste_percent)?,
            margin_percent: validation::percent("margin_percent", self.margin_percent)?,
            tax_enabled: self.tax_enabled,
            tax_percent,
            shipping_rate_id: validation::optional_id("shipping_rate_id", self.shipping_rate_id)?,
            packaging_rate_id: validation::optional_id(
                "packaging_rate_id",
                self.packaging_rate_id,
            )?,
            title: validation::optional_text(self.title.as_deref()),
            notes: validation::optional_text(self.notes.as_deref()),
        })
    }
}

/// Everything written when a quote is saved. The pricing result becomes the
/// stored snapshot and is never recomputed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuote {
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub waste_percent: Decimal,
    pub margin_percent: Decimal,
    pub tax_enabled: bool,
    pub tax_percent: Decimal,
    pub currency: String,
    pub shipping_rate_id: Option<i64>,
    pub packaging_rate_id: Option<i64>,
    pub items: Vec<QuoteItem>,
    pub result: PricingResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub id: QuoteId,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDetailItem {
    pub material_id: i64,
    pub material_name: String,
    pub grams: Decimal,
    pub print_minutes: Decimal,
    pub labor_minutes: Decimal,
    pub quantity: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDetail {
    pub id: QuoteId,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub waste_percent: Decimal,
    pub margin_percent: Decimal,
    pub tax_enabled: bool,
    pub tax_percent: Decimal,
    pub currency: String,
    pub shipping_rate_id: Option<i64>,
    pub packaging_rate_id: Option<i64>,
    pub items: Vec<QuoteDetailItem>,
    pub breakdown: Breakdown,
    pub totals: Totals,
    pub schema_version: u32,
}

impl QuoteDetail {
    pub fn display_title(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title.to_string(),
            _ => format!("Quote #{}", self.id),
        }
    }

    pub fn primary_item(&self) -> Option<&QuoteDetailItem> {
        self.items.first()
    }
}
