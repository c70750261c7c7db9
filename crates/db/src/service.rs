use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use printquote_core::domain::catalog::{
    Material, MaterialInput, PackagingRate, PackagingRateInput, RateConfig, ShippingRate,
    ShippingRateInput,
};
use printquote_core::domain::quote::{NewQuote, QuoteDetail, QuoteId, QuoteRequest, QuoteSummary};
use printquote_core::errors::{ApplicationError, DomainError, Entity};
use printquote_core::export::QuoteTextRenderer;
use printquote_core::pricing::{
    Breakdown, DeterministicPricingEngine, GlobalInput, ItemInput, PricingEngine, PricingResult,
    Totals,
};

use crate::repositories::{
    CatalogRepository, QuoteRepository, RateConfigRepository, SqlCatalogRepository,
    SqlQuoteRepository, SqlRateConfigRepository,
};
use crate::DbPool;

/// Outcome of pricing a request without saving it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PricedQuote {
    pub breakdown: Breakdown,
    pub totals: Totals,
    pub currency: String,
    /// Tax rate the quote was priced with, whether or not tax is enabled.
    pub tax_percent: Decimal,
}

/// Quote workflow over the repositories: price, save, read back, render, and
/// the admin maintenance of the catalog and shop rates.
pub struct QuoteService {
    quotes: Arc<dyn QuoteRepository>,
    catalog: Arc<dyn CatalogRepository>,
    rates: Arc<dyn RateConfigRepository>,
    engine: Arc<dyn PricingEngine>,
    renderer: QuoteTextRenderer,
}

impl QuoteService {
    pub fn new(
        quotes: Arc<dyn QuoteRepository>,
        catalog: Arc<dyn CatalogRepository>,
        rates: Arc<dyn RateConfigRepository>,
        engine: Arc<dyn PricingEngine>,
    ) -> Result<Self, ApplicationError> {
        let renderer = QuoteTextRenderer::new()
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        Ok(Self { quotes, catalog, rates, engine, renderer })
    }

    /// SQLite repositories and the deterministic engine.
    pub fn from_pool(pool: DbPool) -> Result<Self, ApplicationError> {
        Self::new(
            Arc::new(SqlQuoteRepository::new(pool.clone())),
            Arc::new(SqlCatalogRepository::new(pool.clone())),
            Arc::new(SqlRateConfigRepository::new(pool)),
            Arc::new(DeterministicPricingEngine),
        )
    }

    pub async fn price(&self, request: QuoteRequest) -> Result<PricedQuote, ApplicationError> {
        let request = request.validated()?;
        let (result, rates) = self.price_validated(&request).await?;
        let tax_percent = request.tax_percent.unwrap_or(rates.tax_percent);

        Ok(PricedQuote {
            breakdown: result.breakdown,
            totals: result.totals,
            currency: rates.currency,
            tax_percent,
        })
    }

    pub async fn save(&self, request: QuoteRequest) -> Result<QuoteId, ApplicationError> {
        let request = request.validated()?;
        let (result, rates) = self.price_validated(&request).await?;
        let total = result.totals.total;

        let id = self
            .quotes
            .create(NewQuote {
                created_at: Utc::now(),
                title: request.title,
                notes: request.notes,
                waste_percent: request.waste_percent,
                margin_percent: request.margin_percent,
                tax_enabled: request.tax_enabled,
                tax_percent: request.tax_percent.unwrap_or(rates.tax_percent),
                currency: rates.currency,
                shipping_rate_id: request.shipping_rate_id,
                packaging_rate_id: request.packaging_rate_id,
                items: request.items,
                result,
            })
            .await?;

        info!(event_name = "quote.saved", quote_id = id.0, total = %total, "quote saved");
        Ok(id)
    }

    pub async fn detail(&self, id: QuoteId) -> Result<QuoteDetail, ApplicationError> {
        self.quotes.find_detail(id).await?.ok_or_else(|| not_found(Entity::Quote, id.0))
    }

    pub async fn text(&self, id: QuoteId) -> Result<String, ApplicationError> {
        let detail = self.detail(id).await?;
        self.renderer
            .render(&detail)
            .map_err(|error| ApplicationError::Configuration(error.to_string()))
    }

    pub async fn list_quotes(&self, search: &str) -> Result<Vec<QuoteSummary>, ApplicationError> {
        Ok(self.quotes.list(search).await?)
    }

    pub async fn find_active_material(&self, id: i64) -> Result<Material, ApplicationError> {
        self.catalog.find_active_material(id).await?.ok_or_else(|| not_found(Entity::Material, id))
    }

    /// Flat shipping cost of the selected rate; no selection costs nothing.
    pub async fn optional_shipping_cost(
        &self,
        id: Option<i64>,
    ) -> Result<Decimal, ApplicationError> {
        let Some(id) = id else {
            return Ok(Decimal::ZERO);
        };
        let rate = self
            .catalog
            .find_active_shipping_rate(id)
            .await?
            .ok_or_else(|| not_found(Entity::ShippingRate, id))?;
        Ok(rate.flat_cost)
    }

    pub async fn optional_packaging_cost(
        &self,
        id: Option<i64>,
    ) -> Result<Decimal, ApplicationError> {
        let Some(id) = id else {
            return Ok(Decimal::ZERO);
        };
        let rate = self
            .catalog
            .find_active_packaging_rate(id)
            .await?
            .ok_or_else(|| not_found(Entity::PackagingRate, id))?;
        Ok(rate.flat_cost)
    }

    pub async fn rate_config(&self) -> Result<RateConfig, ApplicationError> {
        Ok(self.rates.get().await?)
    }

    pub async fn update_rate_config(
        &self,
        config: RateConfig,
    ) -> Result<RateConfig, ApplicationError> {
        let updated = self.rates.update(config.validated()?).await?;
        info!(event_name = "rates.updated", currency = %updated.currency, "rate config updated");
        Ok(updated)
    }

    pub async fn materials(&self, active_only: bool) -> Result<Vec<Material>, ApplicationError> {
        Ok(self.catalog.list_materials(active_only).await?)
    }

    pub async fn create_material(
        &self,
        input: MaterialInput,
    ) -> Result<Material, ApplicationError> {
        Ok(self.catalog.create_material(input.validated()?).await?)
    }

    pub async fn update_material(
        &self,
        id: i64,
        input: MaterialInput,
    ) -> Result<Material, ApplicationError> {
        Ok(self.catalog.update_material(id, input.validated()?).await?)
    }

    pub async fn shipping_rates(
        &self,
        active_only: bool,
    ) -> Result<Vec<ShippingRate>, ApplicationError> {
        Ok(self.catalog.list_shipping_rates(active_only).await?)
    }

    pub async fn create_shipping_rate(
        &self,
        input: ShippingRateInput,
    ) -> Result<ShippingRate, ApplicationError> {
        Ok(self.catalog.create_shipping_rate(input.validated()?).await?)
    }

    pub async fn update_shipping_rate(
        &self,
        id: i64,
        input: ShippingRateInput,
    ) -> Result<ShippingRate, ApplicationError> {
        Ok(self.catalog.update_shipping_rate(id, input.validated()?).await?)
    }

    pub async fn packaging_rates(
        &self,
        active_only: bool,
    ) -> Result<Vec<PackagingRate>, ApplicationError> {
        Ok(self.catalog.list_packaging_rates(active_only).await?)
    }

    pub async fn create_packaging_rate(
        &self,
        input: PackagingRateInput,
    ) -> Result<PackagingRate, ApplicationError> {
        Ok(self.catalog.create_packaging_rate(input.validated()?).await?)
    }

    pub async fn update_packaging_rate(
        &self,
        id: i64,
        input: PackagingRateInput,
    ) -> Result<PackagingRate, ApplicationError> {
        Ok(self.catalog.update_packaging_rate(id, input.validated()?).await?)
    }

    /// Rates are read once per request and handed to the engine explicitly.
    async fn price_validated(
        &self,
        request: &QuoteRequest,
    ) -> Result<(PricingResult, RateConfig), ApplicationError> {
        let rates = self.rates.get().await?;

        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let material = self.find_active_material(item.material_id).await?;
            items.push(ItemInput {
                grams: item.grams,
                print_minutes: item.print_minutes,
                labor_minutes: item.labor_minutes,
                quantity: item.quantity,
                cost_per_kg: material.cost_per_kg,
            });
        }

        let global = GlobalInput {
            machine_hourly_rate: rates.machine_hourly_rate,
            labor_per_minute: rates.labor_per_minute,
            overhead_fixed: rates.overhead_fixed,
            overhead_percent: rates.overhead_percent,
            failure_rate_percent: rates.failure_rate_percent,
            waste_percent: request.waste_percent,
            margin_percent: request.margin_percent,
            tax_enabled: request.tax_enabled,
            tax_percent: request.tax_percent.unwrap_or(rates.tax_percent),
            packaging_cost: self.optional_packaging_cost(request.packaging_rate_id).await?,
            shipping_cost: self.optional_shipping_cost(request.shipping_rate_id).await?,
        };

        let result = match items.as_slice() {
            [item] => self.engine.price(item, &global),
            items => self.engine.price_batch(items, &global),
        };
        debug!(
            event_name = "quote.priced",
            items = items.len(),
            total = %result.totals.total,
            "quote priced"
        );
        Ok((result, rates))
    }
}

fn not_found(entity: Entity, id: i64) -> ApplicationError {
    ApplicationError::Domain(DomainError::NotFound { entity, id })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use printquote_core::domain::catalog::{
        MaterialInput, PackagingRateInput, RateConfig, ShippingRateInput,
    };
    use printquote_core::domain::quote::{QuoteId, QuoteItem, QuoteRequest};
    use printquote_core::errors::{ApplicationError, DomainError, Entity};
    use printquote_core::pricing::DeterministicPricingEngine;
    use printquote_core::validation::ValidationReason;

    use super::QuoteService;
    use crate::repositories::{
        CatalogRepository, InMemoryCatalogRepository, InMemoryQuoteRepository,
        InMemoryRateConfigRepository, RateConfigRepository,
    };

    struct Harness {
        service: QuoteService,
        catalog: Arc<InMemoryCatalogRepository>,
    }

    async fn harness() -> Harness {
        let quotes = Arc::new(InMemoryQuoteRepository::default());
        let catalog = Arc::new(InMemoryCatalogRepository::default());
        let rates = Arc::new(InMemoryRateConfigRepository::default());

        rates
            .update(RateConfig {
                machine_hourly_rate: Decimal::from(10),
                labor_per_minute: Decimal::from(3),
                tax_percent: Decimal::from(19),
                ..RateConfig::default()
            })
            .await
            .expect("rates");
        let pla = catalog
            .create_material(MaterialInput {
                name: "PLA".to_string(),
                cost_per_kg: Decimal::from(20),
                notes: None,
                active: true,
            })
            .await
            .expect("material");
        quotes.register_material(pla.id, pla.name).await;

        let service = QuoteService::new(
            quotes,
            catalog.clone(),
            rates,
            Arc::new(DeterministicPricingEngine),
        )
        .expect("service");
        Harness { service, catalog }
    }

    fn item(quantity: i64) -> QuoteItem {
        QuoteItem {
            material_id: 1,
            grams: Decimal::from(200),
            print_minutes: Decimal::from(30),
            labor_minutes: Decimal::from(10),
            quantity: Decimal::from(quantity),
        }
    }

    fn request(items: Vec<QuoteItem>) -> QuoteRequest {
        QuoteRequest { items, ..QuoteRequest::default() }
    }

    #[tokio::test]
    async fn single_item_reports_per_unit_components() {
        let h = harness().await;

        let priced = h.service.price(request(vec![item(3)])).await.expect("price");

        assert_eq!(priced.breakdown.material_cost, Decimal::from(4));
        assert_eq!(priced.breakdown.machine_cost, Decimal::from(5));
        assert_eq!(priced.breakdown.labor_cost, Decimal::from(30));
        assert_eq!(priced.breakdown.subtotal, Decimal::from(117));
        assert_eq!(priced.totals.total, Decimal::from(117));
        assert_eq!(priced.currency, "COP");
        assert_eq!(priced.tax_percent, Decimal::from(19));
    }

    #[tokio::test]
    async fn several_items_are_priced_as_one_batch() {
        let h = harness().await;

        let priced = h.service.price(request(vec![item(3), item(1)])).await.expect("price");

        assert_eq!(priced.breakdown.material_cost, Decimal::from(16));
        assert_eq!(priced.breakdown.subtotal, Decimal::from(156));
        assert_eq!(priced.totals.total, Decimal::from(156));
    }

    #[tokio::test]
    async fn tax_defaults_to_the_shop_rate() {
        let h = harness().await;
        let taxed = QuoteRequest { tax_enabled: true, ..request(vec![item(1)]) };

        let priced = h.service.price(taxed.clone()).await.expect("shop rate");
        assert_eq!(priced.breakdown.tax, Decimal::new(741, 2));

        let priced = h
            .service
            .price(QuoteRequest { tax_percent: Some(Decimal::ZERO), ..taxed })
            .await
            .expect("override");
        assert_eq!(priced.breakdown.tax, Decimal::ZERO);
    }

    #[tokio::test]
    async fn selected_shipping_and_packaging_are_added() {
        let h = harness().await;
        let shipping = h
            .service
            .create_shipping_rate(ShippingRateInput {
                scope: "CO".to_string(),
                country: "Colombia".to_string(),
                city: None,
                flat_cost: Decimal::from(12),
                notes: None,
                active: true,
            })
            .await
            .expect("shipping");
        let packaging = h
            .service
            .create_packaging_rate(PackagingRateInput {
                name: "Box".to_string(),
                flat_cost: Decimal::from(3),
                notes: None,
                active: true,
            })
            .await
            .expect("packaging");

        let priced = h
            .service
            .price(QuoteRequest {
                shipping_rate_id: Some(shipping.id),
                packaging_rate_id: Some(packaging.id),
                ..request(vec![item(3)])
            })
            .await
            .expect("price");

        assert_eq!(priced.breakdown.shipping_cost, Decimal::from(12));
        assert_eq!(priced.breakdown.packaging_cost, Decimal::from(3));
        assert_eq!(priced.totals.total, Decimal::from(132));
    }

    #[tokio::test]
    async fn inactive_material_is_not_found() {
        let h = harness().await;
        h.catalog
            .update_material(
                1,
                MaterialInput {
                    name: "PLA".to_string(),
                    cost_per_kg: Decimal::from(20),
                    notes: None,
                    active: false,
                },
            )
            .await
            .expect("deactivate");

        let error = h.service.price(request(vec![item(1)])).await.expect_err("inactive");
        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::NotFound { entity: Entity::Material, id: 1 })
        );
    }

    #[tokio::test]
    async fn missing_shipping_rate_is_not_found() {
        let h = harness().await;

        let error = h
            .service
            .price(QuoteRequest { shipping_rate_id: Some(9), ..request(vec![item(1)]) })
            .await
            .expect_err("missing shipping");
        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::NotFound { entity: Entity::ShippingRate, id: 9 })
        );
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_lookup() {
        let h = harness().await;
        let mut bad = item(1);
        bad.material_id = 42;
        bad.grams = Decimal::ZERO;

        let error = h.service.price(request(vec![bad])).await.expect_err("invalid grams");
        match error {
            ApplicationError::Domain(DomainError::Validation(error)) => {
                assert_eq!(error.field, "items[0].grams");
                assert_eq!(error.reason, ValidationReason::NotPositive);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn saved_quote_keeps_its_snapshot_and_renders() {
        let h = harness().await;
        let id = h
            .service
            .save(QuoteRequest {
                title: Some("  Llavero ".to_string()),
                notes: Some("Entrega el viernes".to_string()),
                ..request(vec![item(3)])
            })
            .await
            .expect("save");

        h.service
            .update_rate_config(RateConfig {
                machine_hourly_rate: Decimal::from(1_000),
                ..RateConfig::default()
            })
            .await
            .expect("rates change");

        let detail = h.service.detail(id).await.expect("detail");
        assert_eq!(detail.title.as_deref(), Some("Llavero"));
        assert_eq!(detail.totals.total, Decimal::from(117));
        assert_eq!(detail.tax_percent, Decimal::from(19));
        assert_eq!(detail.items[0].material_name, "PLA");

        let text = h.service.text(id).await.expect("text");
        assert!(text.starts_with("Llavero\n"));
        assert!(text.contains("Total: 117.00 COP"));
        assert!(text.contains("Entrega el viernes"));

        let listed = h.service.list_quotes("Llave").await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
    }

    #[tokio::test]
    async fn unknown_quote_is_not_found() {
        let h = harness().await;

        assert!(matches!(
            h.service.detail(QuoteId(5)).await,
            Err(ApplicationError::Domain(DomainError::NotFound { entity: Entity::Quote, id: 5 }))
        ));
    }

    #[tokio::test]
    async fn admin_inputs_are_validated_and_duplicates_reported() {
        let h = harness().await;

        let error = h
            .service
            .create_material(MaterialInput {
                name: " PLA ".to_string(),
                cost_per_kg: Decimal::from(25),
                notes: None,
                active: true,
            })
            .await
            .expect_err("duplicate after trim");
        assert_eq!(error.to_string(), "name already exists");

        let error = h
            .service
            .create_shipping_rate(ShippingRateInput {
                scope: "MARS".to_string(),
                country: "Colombia".to_string(),
                city: None,
                flat_cost: Decimal::ZERO,
                notes: None,
                active: true,
            })
            .await
            .expect_err("bad scope");
        assert_eq!(error.to_string(), "scope must be CO or INTL");

        let error = h
            .service
            .update_rate_config(RateConfig {
                overhead_percent: Decimal::from(101),
                ..RateConfig::default()
            })
            .await
            .expect_err("percent");
        assert_eq!(error.to_string(), "overhead_percent must be between 0 and 100");
    }
}
