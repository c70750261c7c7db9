use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::RwLock;

use printquote_core::domain::catalog::{
    Material, MaterialInput, NewShippingRate, PackagingRate, PackagingRateInput, RateConfig,
    ShippingRate,
};
use printquote_core::domain::quote::{
    NewQuote, QuoteDetail, QuoteDetailItem, QuoteId, QuoteSummary,
};
use printquote_core::errors::Entity;
use printquote_core::snapshot::SNAPSHOT_SCHEMA_VERSION;

use super::{CatalogRepository, QuoteRepository, RateConfigRepository, RepositoryError};

/// Quotes kept in memory. Material names come from `register_material`; unknown
/// ids render as an empty name like the SQL left join.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<BTreeMap<i64, NewQuote>>,
    material_names: RwLock<BTreeMap<i64, String>>,
}

impl InMemoryQuoteRepository {
    pub async fn register_material(&self, id: i64, name: impl Into<String>) {
        self.material_names.write().await.insert(id, name.into());
    }
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn create(&self, quote: NewQuote) -> Result<QuoteId, RepositoryError> {
        if quote.items.is_empty() {
            return Err(RepositoryError::Constraint(
                "a quote needs at least one line item".to_string(),
            ));
        }
        let mut quotes = self.quotes.write().await;
        let id = next_id(&quotes);
        quotes.insert(id, quote);
        Ok(QuoteId(id))
    }

    async fn find_detail(&self, id: QuoteId) -> Result<Option<QuoteDetail>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let Some(quote) = quotes.get(&id.0) else {
            return Ok(None);
        };
        let names = self.material_names.read().await;

        Ok(Some(QuoteDetail {
            id,
            created_at: quote.created_at,
            title: quote.title.clone(),
            notes: quote.notes.clone(),
            waste_percent: quote.waste_percent,
            margin_percent: quote.margin_percent,
            tax_enabled: quote.tax_enabled,
            tax_percent: quote.tax_percent,
            currency: quote.currency.clone(),
            shipping_rate_id: quote.shipping_rate_id,
            packaging_rate_id: quote.packaging_rate_id,
            items: quote
                .items
                .iter()
                .map(|item| QuoteDetailItem {
                    material_id: item.material_id,
                    material_name: names.get(&item.material_id).cloned().unwrap_or_default(),
                    grams: item.grams,
                    print_minutes: item.print_minutes,
                    labor_minutes: item.labor_minutes,
                    quantity: item.quantity,
                })
                .collect(),
            breakdown: quote.result.breakdown.clone(),
            totals: quote.result.totals.clone(),
            schema_version: SNAPSHOT_SCHEMA_VERSION,
        }))
    }

    async fn list(&self, search: &str) -> Result<Vec<QuoteSummary>, RepositoryError> {
        let search = search.trim();
        let quotes = self.quotes.read().await;
        let mut listed: Vec<QuoteSummary> = quotes
            .iter()
            .filter(|(_, quote)| {
                search.is_empty()
                    || quote.title.as_deref().is_some_and(|title| title.contains(search))
                    || quote.notes.as_deref().is_some_and(|notes| notes.contains(search))
            })
            .map(|(id, quote)| QuoteSummary {
                id: QuoteId(*id),
                created_at: quote.created_at,
                title: quote.title.clone().unwrap_or_default(),
                total: quote.result.totals.total,
            })
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    materials: RwLock<BTreeMap<i64, Material>>,
    shipping_rates: RwLock<BTreeMap<i64, ShippingRate>>,
    packaging_rates: RwLock<BTreeMap<i64, PackagingRate>>,
}

fn next_id<T>(rows: &BTreeMap<i64, T>) -> i64 {
    rows.keys().next_back().map_or(1, |last| last + 1)
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_active_material(&self, id: i64) -> Result<Option<Material>, RepositoryError> {
        let materials = self.materials.read().await;
        Ok(materials.get(&id).filter(|material| material.active).cloned())
    }

    async fn find_active_shipping_rate(
        &self,
        id: i64,
    ) -> Result<Option<ShippingRate>, RepositoryError> {
        let rates = self.shipping_rates.read().await;
        Ok(rates.get(&id).filter(|rate| rate.active).cloned())
    }

    async fn find_active_packaging_rate(
        &self,
        id: i64,
    ) -> Result<Option<PackagingRate>, RepositoryError> {
        let rates = self.packaging_rates.read().await;
        Ok(rates.get(&id).filter(|rate| rate.active).cloned())
    }

    async fn list_materials(&self, active_only: bool) -> Result<Vec<Material>, RepositoryError> {
        let materials = self.materials.read().await;
        if active_only {
            let mut active: Vec<Material> =
                materials.values().filter(|material| material.active).cloned().collect();
            active.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(active)
        } else {
            Ok(materials.values().rev().cloned().collect())
        }
    }

    async fn create_material(&self, input: MaterialInput) -> Result<Material, RepositoryError> {
        let mut materials = self.materials.write().await;
        if materials.values().any(|material| material.name == input.name) {
            return Err(RepositoryError::Duplicate { field: "name" });
        }
        let material = Material {
            id: next_id(&materials),
            name: input.name,
            cost_per_kg: input.cost_per_kg,
            notes: input.notes,
            active: input.active,
        };
        materials.insert(material.id, material.clone());
        Ok(material)
    }

    async fn update_material(
        &self,
        id: i64,
        input: MaterialInput,
    ) -> Result<Material, RepositoryError> {
        let mut materials = self.materials.write().await;
        if materials.values().any(|material| material.id != id && material.name == input.name) {
            return Err(RepositoryError::Duplicate { field: "name" });
        }
        let material = materials
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound { entity: Entity::Material, id })?;
        material.name = input.name;
        material.cost_per_kg = input.cost_per_kg;
        material.notes = input.notes;
        material.active = input.active;
        Ok(material.clone())
    }

    async fn list_shipping_rates(
        &self,
        active_only: bool,
    ) -> Result<Vec<ShippingRate>, RepositoryError> {
        let rates = self.shipping_rates.read().await;
        Ok(rates.values().rev().filter(|rate| !active_only || rate.active).cloned().collect())
    }

    async fn create_shipping_rate(
        &self,
        input: NewShippingRate,
    ) -> Result<ShippingRate, RepositoryError> {
        let mut rates = self.shipping_rates.write().await;
        let rate = ShippingRate {
            id: next_id(&rates),
            scope: input.scope,
            country: input.country,
            city: input.city,
            flat_cost: input.flat_cost,
            notes: input.notes,
            active: input.active,
        };
        rates.insert(rate.id, rate.clone());
        Ok(rate)
    }

    async fn update_shipping_rate(
        &self,
        id: i64,
        input: NewShippingRate,
    ) -> Result<ShippingRate, RepositoryError> {
        let mut rates = self.shipping_rates.write().await;
        let rate = rates
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound { entity: Entity::ShippingRate, id })?;
        *rate = ShippingRate {
            id,
            scope: input.scope,
            country: input.country,
            city: input.city,
            flat_cost: input.flat_cost,
            notes: input.notes,
            active: input.active,
        };
        Ok(rate.clone())
    }

    async fn list_packaging_rates(
        &self,
        active_only: bool,
    ) -> Result<Vec<PackagingRate>, RepositoryError> {
        let rates = self.packaging_rates.read().await;
        Ok(rates.values().rev().filter(|rate| !active_only || rate.active).cloned().collect())
    }

    async fn create_packaging_rate(
        &self,
        input: PackagingRateInput,
    ) -> Result<PackagingRate, RepositoryError> {
        let mut rates = self.packaging_rates.write().await;
        let rate = PackagingRate {
            id: next_id(&rates),
            name: input.name,
            flat_cost: input.flat_cost,
            notes: input.notes,
            active: input.active,
        };
        rates.insert(rate.id, rate.clone());
        Ok(rate)
    }

    async fn update_packaging_rate(
        &self,
        id: i64,
        input: PackagingRateInput,
    ) -> Result<PackagingRate, RepositoryError> {
        let mut rates = self.packaging_rates.write().await;
        let rate = rates
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound { entity: Entity::PackagingRate, id })?;
        *rate = PackagingRate {
            id,
            name: input.name,
            flat_cost: input.flat_cost,
            notes: input.notes,
            active: input.active,
        };
        Ok(rate.clone())
    }
}

#[derive(Default)]
pub struct InMemoryRateConfigRepository {
    config: RwLock<Option<RateConfig>>,
}

#[async_trait::async_trait]
impl RateConfigRepository for InMemoryRateConfigRepository {
    async fn ensure(&self) -> Result<(), RepositoryError> {
        let mut config = self.config.write().await;
        if config.is_none() {
            *config = Some(RateConfig { updated_at: Some(Utc::now()), ..RateConfig::default() });
        }
        Ok(())
    }

    async fn get(&self) -> Result<RateConfig, RepositoryError> {
        self.ensure().await?;
        Ok(self.config.read().await.clone().unwrap_or_default())
    }

    async fn update(&self, config: RateConfig) -> Result<RateConfig, RepositoryError> {
        let stored = RateConfig { updated_at: Some(Utc::now()), ..config };
        *self.config.write().await = Some(stored.clone());
        Ok(stored)
    }
}
