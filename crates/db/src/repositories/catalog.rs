use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use printquote_core::domain::catalog::{
    Material, MaterialInput, NewShippingRate, PackagingRate, PackagingRateInput, ShippingRate,
    ShippingScope,
};
use printquote_core::errors::Entity;

use super::{
    bool_flag, decimal_column, format_timestamp, map_unique_violation, CatalogRepository,
    RepositoryError,
};
use crate::DbPool;

const MATERIAL_COLUMNS: &str = "id, name, cost_per_kg, notes, active";
const SHIPPING_COLUMNS: &str = "id, scope, country, city, flat_cost, notes, active";
const PACKAGING_COLUMNS: &str = "id, name, flat_cost, notes, active";

/// Materials, shipping rates and packaging rates. Rows are never deleted; an
/// inactive row stays readable for old quotes but cannot be selected for new ones.
pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn material(&self, id: i64) -> Result<Material, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound { entity: Entity::Material, id })?;
        material_from_row(&row)
    }

    async fn shipping_rate(&self, id: i64) -> Result<ShippingRate, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {SHIPPING_COLUMNS} FROM shipping_rates WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(RepositoryError::NotFound { entity: Entity::ShippingRate, id })?;
        shipping_rate_from_row(&row)
    }

    async fn packaging_rate(&self, id: i64) -> Result<PackagingRate, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {PACKAGING_COLUMNS} FROM packaging_rates WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(RepositoryError::NotFound { entity: Entity::PackagingRate, id })?;
        packaging_rate_from_row(&row)
    }
}

#[async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn find_active_material(&self, id: i64) -> Result<Option<Material>, RepositoryError> {
        sqlx::query(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ? AND active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(material_from_row)
        .transpose()
    }

    async fn find_active_shipping_rate(
        &self,
        id: i64,
    ) -> Result<Option<ShippingRate>, RepositoryError> {
        sqlx::query(&format!(
            "SELECT {SHIPPING_COLUMNS} FROM shipping_rates WHERE id = ? AND active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(shipping_rate_from_row)
        .transpose()
    }

    async fn find_active_packaging_rate(
        &self,
        id: i64,
    ) -> Result<Option<PackagingRate>, RepositoryError> {
        sqlx::query(&format!(
            "SELECT {PACKAGING_COLUMNS} FROM packaging_rates WHERE id = ? AND active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(packaging_rate_from_row)
        .transpose()
    }

    async fn list_materials(&self, active_only: bool) -> Result<Vec<Material>, RepositoryError> {
        // The quote form lists selectable materials alphabetically; admin views see newest first.
        let sql = if active_only {
            format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE active = 1 ORDER BY name ASC")
        } else {
            format!("SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY id DESC")
        };
        sqlx::query(&sql).fetch_all(&self.pool).await?.iter().map(material_from_row).collect()
    }

    async fn create_material(&self, input: MaterialInput) -> Result<Material, RepositoryError> {
        let id = sqlx::query(
            r#"
            INSERT INTO materials (name, cost_per_kg, notes, active, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(input.cost_per_kg.to_string())
        .bind(&input.notes)
        .bind(i64::from(input.active))
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_violation(error, "name"))?
        .last_insert_rowid();

        self.material(id).await
    }

    async fn update_material(
        &self,
        id: i64,
        input: MaterialInput,
    ) -> Result<Material, RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE materials
            SET name = ?, cost_per_kg = ?, notes = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(input.cost_per_kg.to_string())
        .bind(&input.notes)
        .bind(i64::from(input.active))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_violation(error, "name"))?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::NotFound { entity: Entity::Material, id });
        }
        self.material(id).await
    }

    async fn list_shipping_rates(
        &self,
        active_only: bool,
    ) -> Result<Vec<ShippingRate>, RepositoryError> {
        let filter = if active_only { "WHERE active = 1" } else { "" };
        sqlx::query(&format!(
            "SELECT {SHIPPING_COLUMNS} FROM shipping_rates {filter} ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(shipping_rate_from_row)
        .collect()
    }

    async fn create_shipping_rate(
        &self,
        input: NewShippingRate,
    ) -> Result<ShippingRate, RepositoryError> {
        let id = sqlx::query(
            r#"
            INSERT INTO shipping_rates (scope, country, city, flat_cost, notes, active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(input.scope.as_str())
        .bind(&input.country)
        .bind(&input.city)
        .bind(input.flat_cost.to_string())
        .bind(&input.notes)
        .bind(i64::from(input.active))
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.shipping_rate(id).await
    }

    async fn update_shipping_rate(
        &self,
        id: i64,
        input: NewShippingRate,
    ) -> Result<ShippingRate, RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE shipping_rates
            SET scope = ?, country = ?, city = ?, flat_cost = ?, notes = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(input.scope.as_str())
        .bind(&input.country)
        .bind(&input.city)
        .bind(input.flat_cost.to_string())
        .bind(&input.notes)
        .bind(i64::from(input.active))
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::NotFound { entity: Entity::ShippingRate, id });
        }
        self.shipping_rate(id).await
    }

    async fn list_packaging_rates(
        &self,
        active_only: bool,
    ) -> Result<Vec<PackagingRate>, RepositoryError> {
        let filter = if active_only { "WHERE active = 1" } else { "" };
        sqlx::query(&format!(
            "SELECT {PACKAGING_COLUMNS} FROM packaging_rates {filter} ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(packaging_rate_from_row)
        .collect()
    }

    async fn create_packaging_rate(
        &self,
        input: PackagingRateInput,
    ) -> Result<PackagingRate, RepositoryError> {
        let id = sqlx::query(
            r#"
            INSERT INTO packaging_rates (name, flat_cost, notes, active, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(input.flat_cost.to_string())
        .bind(&input.notes)
        .bind(i64::from(input.active))
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.packaging_rate(id).await
    }

    async fn update_packaging_rate(
        &self,
        id: i64,
        input: PackagingRateInput,
    ) -> Result<PackagingRate, RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE packaging_rates
            SET name = ?, flat_cost = ?, notes = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(input.flat_cost.to_string())
        .bind(&input.notes)
        .bind(i64::from(input.active))
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::NotFound { entity: Entity::PackagingRate, id });
        }
        self.packaging_rate(id).await
    }
}

fn material_from_row(row: &SqliteRow) -> Result<Material, RepositoryError> {
    Ok(Material {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        cost_per_kg: decimal_column(row, "cost_per_kg")?,
        notes: row.try_get("notes")?,
        active: bool_flag("active", row.try_get("active")?)?,
    })
}

fn shipping_rate_from_row(row: &SqliteRow) -> Result<ShippingRate, RepositoryError> {
    let scope: String = row.try_get("scope")?;
    Ok(ShippingRate {
        id: row.try_get("id")?,
        scope: ShippingScope::parse_stored(&scope)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown shipping scope '{scope}'")))?,
        country: row.try_get("country")?,
        city: row.try_get("city")?,
        flat_cost: decimal_column(row, "flat_cost")?,
        notes: row.try_get("notes")?,
        active: bool_flag("active", row.try_get("active")?)?,
    })
}

fn packaging_rate_from_row(row: &SqliteRow) -> Result<PackagingRate, RepositoryError> {
    Ok(PackagingRate {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        flat_cost: decimal_column(row, "flat_cost")?,
        notes: row.try_get("notes")?,
        active: bool_flag("active", row.try_get("active")?)?,
    })
}
