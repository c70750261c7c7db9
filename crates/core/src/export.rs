//! Plain-text rendering of a saved quote, suitable for pasting into a chat or email.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::quote::QuoteDetail;

const QUOTE_TEXT_TEMPLATE: &str = "quote.txt.tera";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to load quote text template: {0}")]
    Template(#[source] tera::Error),
    #[error("failed to render quote text: {0}")]
    Render(#[source] tera::Error),
}

pub struct QuoteTextRenderer {
    tera: Tera,
}

impl QuoteTextRenderer {
    pub fn new() -> Result<Self, ExportError> {
        let mut tera = Tera::default();
        tera.register_filter("amount", amount_filter);
        tera.register_filter("plain", plain_filter);
        tera.add_raw_template(
            QUOTE_TEXT_TEMPLATE,
            include_str!("../../../templates/quote.txt.tera"),
        )
        .map_err(ExportError::Template)?;

        Ok(Self { tera })
    }

    pub fn render(&self, detail: &QuoteDetail) -> Result<String, ExportError> {
        let mut context = Context::new();
        context.insert("title", &detail.display_title());
        context.insert("date", &detail.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
        context.insert("currency", &detail.currency);
        context.insert("totals", &detail.totals);
        context.insert("breakdown", &detail.breakdown);
        context.insert("waste_percent", &detail.waste_percent);
        context.insert("margin_percent", &detail.margin_percent);
        context.insert("tax_enabled", &detail.tax_enabled);
        context.insert("tax_percent", &detail.tax_percent);
        context.insert("items", &detail.items);
        context.insert("notes", &detail.notes);

        let rendered =
            self.tera.render(QUOTE_TEXT_TEMPLATE, &context).map_err(ExportError::Render)?;
        Ok(format!("{}\n", rendered.trim_end()))
    }
}

/// Renders with a throwaway renderer. Services that render repeatedly keep a
/// [`QuoteTextRenderer`] instead.
pub fn render_quote_text(detail: &QuoteDetail) -> Result<String, ExportError> {
    QuoteTextRenderer::new()?.render(detail)
}

/// Two decimal places, half away from zero.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

fn decimal_arg(value: &tera::Value, filter: &str) -> tera::Result<Decimal> {
    let text = match value {
        tera::Value::String(text) => text.clone(),
        tera::Value::Number(number) => number.to_string(),
        tera::Value::Null => return Ok(Decimal::ZERO),
        other => {
            return Err(tera::Error::msg(format!("{filter} filter expects a number, got {other}")))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| tera::Error::msg(format!("{filter} filter could not parse `{text}`")))
}

fn amount_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    Ok(tera::Value::String(format_amount(decimal_arg(value, "amount")?)))
}

fn plain_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    Ok(tera::Value::String(decimal_arg(value, "plain")?.normalize().to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{format_amount, render_quote_text};
    use crate::domain::quote::{QuoteDetail, QuoteDetailItem, QuoteId};
    use crate::pricing::{Breakdown, Totals};

    fn detail() -> QuoteDetail {
        QuoteDetail {
            id: QuoteId(7),
            created_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("timestamp"),
            title: None,
            notes: None,
            waste_percent: Decimal::from(5),
            margin_percent: Decimal::new(125, 1),
            tax_enabled: false,
            tax_percent: Decimal::from(19),
            currency: "COP".to_string(),
            shipping_rate_id: None,
            packaging_rate_id: None,
            items: vec![QuoteDetailItem {
                material_id: 1,
                material_name: "PLA (Generic)".to_string(),
                grams: Decimal::from(200),
                print_minutes: Decimal::from(30),
                labor_minutes: Decimal::from(10),
                quantity: Decimal::from(3),
            }],
            breakdown: Breakdown {
                material_cost: Decimal::from(4),
                machine_cost: Decimal::from(5),
                labor_cost: Decimal::from(30),
                subtotal: Decimal::from(117),
                ..Breakdown::default()
            },
            totals: Totals { total: Decimal::from(117) },
            schema_version: 2,
        }
    }

    #[test]
    fn falls_back_to_numbered_title() {
        let text = render_quote_text(&detail()).expect("render");

        assert!(text.starts_with("Quote #7\nDate: 2026-03-14 09:30:00 UTC\n"));
        assert!(text.contains("Total: 117.00 COP"));
        assert!(text.contains("- Material: 4.00 COP"));
        assert!(text.contains("- Subtotal: 117.00 COP"));
        assert!(text.contains("- Margin: 12.50%"));
        assert!(text.contains("- Tax: not included (19.00%)"));
        assert!(text.contains("- Material: PLA (Generic)"));
        assert!(text.contains("- Quantity: 3"));
        assert!(!text.contains("Notes:"));
        assert!(text.ends_with("- Quantity: 3\n"));
    }

    #[test]
    fn includes_title_tax_and_notes_when_present() {
        let text = render_quote_text(&QuoteDetail {
            title: Some("Llavero personalizado".to_string()),
            notes: Some("Entrega <viernes>".to_string()),
            tax_enabled: true,
            ..detail()
        })
        .expect("render");

        assert!(text.starts_with("Llavero personalizado\n"));
        assert!(text.contains("- Tax: included (19.00%)"));
        assert!(text.ends_with("Notes:\nEntrega <viernes>\n"), "notes are not escaped: {text}");
    }

    #[test]
    fn amounts_round_half_away_from_zero() {
        assert_eq!(format_amount(Decimal::new(12345, 3)), "12.35");
        assert_eq!(format_amount(Decimal::from(3)), "3.00");
        assert_eq!(format_amount(Decimal::new(-5, 3)), "-0.01");
    }
}
