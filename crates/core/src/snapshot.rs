//! Quote snapshot documents.
//!
//! A saved quote keeps its figures as two independent JSON texts: the cost
//! breakdown and the totals. Writing always uses the current key set. Reading
//! tolerates every shape earlier releases produced: keys are normalized, nested
//! objects are flattened with `_`, and each canonical field is looked up through
//! an ordered alias list. Anything missing reads as zero and text that is not
//! JSON at all reads as an all-zero snapshot.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::warn;

use crate::pricing::{Breakdown, PricingResult, Totals};

/// Version tag written into every new snapshot document.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 2;
/// Version assumed for documents written before the tag existed.
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SnapshotField {
    MaterialCost,
    MachineCost,
    LaborCost,
    Subtotal,
    Overhead,
    FailureInsurance,
    PackagingCost,
    ShippingCost,
    Margin,
    Tax,
    Total,
}

impl SnapshotField {
    pub const ALL: [SnapshotField; 11] = [
        SnapshotField::MaterialCost,
        SnapshotField::MachineCost,
        SnapshotField::LaborCost,
        SnapshotField::Subtotal,
        SnapshotField::Overhead,
        SnapshotField::FailureInsurance,
        SnapshotField::PackagingCost,
        SnapshotField::ShippingCost,
        SnapshotField::Margin,
        SnapshotField::Tax,
        SnapshotField::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaterialCost => "material_cost",
            Self::MachineCost => "machine_cost",
            Self::LaborCost => "labor_cost",
            Self::Subtotal => "subtotal",
            Self::Overhead => "overhead",
            Self::FailureInsurance => "failure_insurance",
            Self::PackagingCost => "packaging_cost",
            Self::ShippingCost => "shipping_cost",
            Self::Margin => "margin",
            Self::Tax => "tax",
            Self::Total => "total",
        }
    }
}

/// Canonical field -> ordered list of accepted source keys, plus the wrapper
/// object names whose flattened prefix is also tried for every alias.
///
/// Adding a historical key name is a data change:
///
/// ```
/// use printquote_core::snapshot::{AliasTable, SnapshotField, SnapshotDecoder};
///
/// let table = AliasTable::default().with_alias(SnapshotField::Total, "amount_due");
/// let totals = SnapshotDecoder::new(table).decode_totals(r#"{"amount_due": 42}"#);
/// assert_eq!(totals.total, 42.into());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<SnapshotField, Vec<String>>,
    wrappers: Vec<String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self { aliases: BTreeMap::new(), wrappers: Vec::new() }
    }

    /// Appends `alias` at the lowest priority for `field`.
    pub fn with_alias(mut self, field: SnapshotField, alias: impl Into<String>) -> Self {
        let alias = normalize_key(&alias.into());
        let entry = self.aliases.entry(field).or_default();
        if !entry.contains(&alias) {
            entry.push(alias);
        }
        self
    }

    pub fn with_aliases<I, S>(self, field: SnapshotField, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        aliases.into_iter().fold(self, |table, alias| table.with_alias(field, alias))
    }

    pub fn with_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        let wrapper = normalize_key(&wrapper.into());
        if !self.wrappers.contains(&wrapper) {
            self.wrappers.push(wrapper);
        }
        self
    }

    pub fn aliases(&self, field: SnapshotField) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn wrappers(&self) -> &[String] {
        &self.wrappers
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::empty()
            .with_aliases(SnapshotField::MaterialCost, ["material_cost", "material"])
            .with_aliases(SnapshotField::MachineCost, ["machine_cost", "machine"])
            .with_aliases(SnapshotField::LaborCost, ["labor_cost", "labor"])
            .with_alias(SnapshotField::Subtotal, "subtotal")
            .with_alias(SnapshotField::Overhead, "overhead")
            .with_aliases(SnapshotField::FailureInsurance, ["failure_insurance", "failure"])
            .with_aliases(SnapshotField::PackagingCost, ["packaging_cost", "packaging"])
            .with_aliases(SnapshotField::ShippingCost, ["shipping_cost", "shipping"])
            .with_alias(SnapshotField::Margin, "margin")
            .with_alias(SnapshotField::Tax, "tax")
            .with_aliases(SnapshotField::Total, ["total", "grand_total", "final_total"])
            .with_wrapper("breakdown")
            .with_wrapper("totals")
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode {document} snapshot: {source}")]
    Encode { document: &'static str, source: serde_json::Error },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotDocuments {
    pub breakdown_json: String,
    pub totals_json: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedSnapshot {
    pub breakdown: Breakdown,
    pub totals: Totals,
    pub schema_version: u32,
}

#[derive(Serialize)]
struct BreakdownDocument {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    material_cost: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    machine_cost: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    labor_cost: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    overhead: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    failure_insurance: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    packaging_cost: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    shipping_cost: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    margin: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    tax: Decimal,
    schema_version: u32,
}

impl From<&Breakdown> for BreakdownDocument {
    fn from(breakdown: &Breakdown) -> Self {
        Self {
            material_cost: breakdown.material_cost,
            machine_cost: breakdown.machine_cost,
            labor_cost: breakdown.labor_cost,
            subtotal: breakdown.subtotal,
            overhead: breakdown.overhead,
            failure_insurance: breakdown.failure_insurance,
            packaging_cost: breakdown.packaging_cost,
            shipping_cost: breakdown.shipping_cost,
            margin: breakdown.margin,
            tax: breakdown.tax,
            schema_version: SNAPSHOT_SCHEMA_VERSION,
        }
    }
}

#[derive(Serialize)]
struct TotalsDocument {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    total: Decimal,
    schema_version: u32,
}

pub fn encode_breakdown(breakdown: &Breakdown) -> Result<String, SnapshotError> {
    serde_json::to_string(&BreakdownDocument::from(breakdown))
        .map_err(|source| SnapshotError::Encode { document: "breakdown", source })
}

pub fn encode_totals(totals: &Totals) -> Result<String, SnapshotError> {
    let document = TotalsDocument { total: totals.total, schema_version: SNAPSHOT_SCHEMA_VERSION };
    serde_json::to_string(&document)
        .map_err(|source| SnapshotError::Encode { document: "totals", source })
}

pub fn encode_snapshot(result: &PricingResult) -> Result<SnapshotDocuments, SnapshotError> {
    Ok(SnapshotDocuments {
        breakdown_json: encode_breakdown(&result.breakdown)?,
        totals_json: encode_totals(&result.totals)?,
    })
}

#[derive(Clone, Debug, Default)]
pub struct SnapshotDecoder {
    aliases: AliasTable,
}

impl SnapshotDecoder {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn decode_breakdown(&self, raw: &str) -> Breakdown {
        let values = numeric_values(raw, "breakdown");
        self.breakdown_from(&values)
    }

    pub fn decode_totals(&self, raw: &str) -> Totals {
        let values = numeric_values(raw, "totals");
        Totals { total: self.pick(&values, SnapshotField::Total) }
    }

    pub fn decode(&self, breakdown_json: &str, totals_json: &str) -> DecodedSnapshot {
        let breakdown_values = numeric_values(breakdown_json, "breakdown");
        let totals_values = numeric_values(totals_json, "totals");

        let schema_version = schema_version(&breakdown_values)
            .or_else(|| schema_version(&totals_values))
            .unwrap_or(LEGACY_SCHEMA_VERSION);

        DecodedSnapshot {
            breakdown: self.breakdown_from(&breakdown_values),
            totals: Totals { total: self.pick(&totals_values, SnapshotField::Total) },
            schema_version,
        }
    }

    fn breakdown_from(&self, values: &BTreeMap<String, Decimal>) -> Breakdown {
        Breakdown {
            material_cost: self.pick(values, SnapshotField::MaterialCost),
            machine_cost: self.pick(values, SnapshotField::MachineCost),
            labor_cost: self.pick(values, SnapshotField::LaborCost),
            subtotal: self.pick(values, SnapshotField::Subtotal),
            overhead: self.pick(values, SnapshotField::Overhead),
            failure_insurance: self.pick(values, SnapshotField::FailureInsurance),
            packaging_cost: self.pick(values, SnapshotField::PackagingCost),
            shipping_cost: self.pick(values, SnapshotField::ShippingCost),
            margin: self.pick(values, SnapshotField::Margin),
            tax: self.pick(values, SnapshotField::Tax),
        }
    }

    fn pick(&self, values: &BTreeMap<String, Decimal>, field: SnapshotField) -> Decimal {
        for alias in self.aliases.aliases(field) {
            if let Some(value) = values.get(alias) {
                return *value;
            }
            for wrapper in self.aliases.wrappers() {
                if let Some(value) = values.get(&format!("{wrapper}_{alias}")) {
                    return *value;
                }
            }
        }
        Decimal::ZERO
    }
}

/// Decodes both documents with the default alias table.
pub fn decode_snapshot(breakdown_json: &str, totals_json: &str) -> DecodedSnapshot {
    SnapshotDecoder::default().decode(breakdown_json, totals_json)
}

pub fn decode_breakdown(raw: &str) -> Breakdown {
    SnapshotDecoder::default().decode_breakdown(raw)
}

/// Total amount of a totals document, used by list rows.
pub fn extract_total(totals_json: &str) -> Decimal {
    SnapshotDecoder::default().decode_totals(totals_json).total
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('-', "_")
}

fn numeric_values(raw: &str, document: &'static str) -> BTreeMap<String, Decimal> {
    let mut values = BTreeMap::new();
    match serde_json::from_str::<Map<String, Value>>(raw) {
        Ok(source) => collect_numeric_values(&mut values, None, &source),
        Err(error) => {
            warn!(
                event_name = "snapshot.decode.degraded",
                document,
                error = %error,
                "snapshot document is not a JSON object; reading as zero"
            );
        }
    }
    values
}

fn collect_numeric_values(
    values: &mut BTreeMap<String, Decimal>,
    prefix: Option<&str>,
    source: &Map<String, Value>,
) {
    for (key, value) in source {
        let key = match prefix {
            Some(prefix) => format!("{prefix}_{}", normalize_key(key)),
            None => normalize_key(key),
        };

        match value {
            Value::Number(number) => {
                if let Some(amount) = decimal_from_number(number) {
                    values.insert(key, amount);
                }
            }
            Value::String(text) => {
                if let Some(amount) = decimal_from_text(text) {
                    values.insert(key, amount);
                }
            }
            Value::Object(child) => collect_numeric_values(values, Some(&key), child),
            _ => {}
        }
    }
}

fn decimal_from_number(number: &Number) -> Option<Decimal> {
    decimal_from_text(&number.to_string())
        .or_else(|| number.as_f64().and_then(|value| Decimal::try_from(value).ok()))
}

fn decimal_from_text(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
}

fn schema_version(values: &BTreeMap<String, Decimal>) -> Option<u32> {
    values.get(SCHEMA_VERSION_KEY).and_then(ToPrimitive::to_u32)
}
