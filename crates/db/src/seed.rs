use chrono::Utc;
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::{format_timestamp, RepositoryError};

pub const DEFAULT_MATERIAL_NAME: &str = "PLA (Generic)";
pub const DEFAULT_PACKAGING_NAME: &str = "Standard packaging";
pub const DEFAULT_SHIPPING_COUNTRY: &str = "Colombia";
pub const DEFAULT_SHIPPING_CITY: &str = "Bogota";
pub const DEFAULT_TAX_PERCENT: &str = "19";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: u64,
}

/// Inserts the starter catalog: one material, the rate row, one packaging rate
/// and a local shipping rate. Rows that already exist are left untouched, so
/// running it twice inserts nothing the second time.
pub async fn seed_defaults(pool: &DbPool) -> Result<SeedReport, RepositoryError> {
    let now = format_timestamp(Utc::now());
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    inserted += sqlx::query(
        r#"
        INSERT INTO materials (name, cost_per_kg, notes, active, created_at)
        VALUES (?, '0', NULL, 1, ?)
        ON CONFLICT(name) DO NOTHING
        "#,
    )
    .bind(DEFAULT_MATERIAL_NAME)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    inserted += sqlx::query(
        r#"
        INSERT INTO rate_config (id, tax_percent, currency, updated_at)
        VALUES (1, ?, 'COP', ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(DEFAULT_TAX_PERCENT)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    inserted += sqlx::query(
        r#"
        INSERT INTO packaging_rates (name, flat_cost, notes, active, created_at)
        SELECT ?, '0', NULL, 1, ?
        WHERE NOT EXISTS (SELECT 1 FROM packaging_rates WHERE name = ?)
        "#,
    )
    .bind(DEFAULT_PACKAGING_NAME)
    .bind(&now)
    .bind(DEFAULT_PACKAGING_NAME)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    inserted += sqlx::query(
        r#"
        INSERT INTO shipping_rates (scope, country, city, flat_cost, notes, active, created_at)
        SELECT 'CITY', ?, ?, '0', NULL, 1, ?
        WHERE NOT EXISTS (
            SELECT 1 FROM shipping_rates WHERE country = ? AND city = ?
        )
        "#,
    )
    .bind(DEFAULT_SHIPPING_COUNTRY)
    .bind(DEFAULT_SHIPPING_CITY)
    .bind(&now)
    .bind(DEFAULT_SHIPPING_COUNTRY)
    .bind(DEFAULT_SHIPPING_CITY)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;
    info!(event_name = "db.seed.completed", inserted, "default catalog seeded");
    Ok(SeedReport { inserted })
}
