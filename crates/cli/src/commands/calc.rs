use printquote_core::domain::quote::{QuoteItem, QuoteRequest};
use printquote_db::QuoteService;
use rust_decimal::Decimal;

use crate::commands::{application_failure, with_database, CommandResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalcArgs {
    pub material_id: i64,
    pub grams: Decimal,
    pub print_minutes: Decimal,
    pub labor_minutes: Decimal,
    pub quantity: Decimal,
    pub waste_percent: Decimal,
    pub margin_percent: Decimal,
    pub tax_enabled: bool,
    pub tax_percent: Option<Decimal>,
    pub shipping_rate_id: Option<i64>,
    pub packaging_rate_id: Option<i64>,
}

impl CalcArgs {
    pub fn into_request(self) -> QuoteRequest {
        QuoteRequest {
            items: vec![QuoteItem {
                material_id: self.material_id,
                grams: self.grams,
                print_minutes: self.print_minutes,
                labor_minutes: self.labor_minutes,
                quantity: self.quantity,
            }],
            waste_percent: self.waste_percent,
            margin_percent: self.margin_percent,
            tax_enabled: self.tax_enabled,
            tax_percent: self.tax_percent,
            shipping_rate_id: self.shipping_rate_id,
            packaging_rate_id: self.packaging_rate_id,
            title: None,
            notes: None,
        }
    }
}

pub fn run(args: CalcArgs) -> CommandResult {
    let request = args.into_request();
    let result = with_database("calc", |pool| async move {
        let service = QuoteService::from_pool(pool).map_err(application_failure)?;
        service.price(request).await.map_err(application_failure)
    });

    match result {
        Ok(priced) => CommandResult::payload("calc", &priced),
        Err(failure) => failure,
    }
}
