use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use printquote_core::domain::catalog::RateConfig;

use super::{
    decimal_column, format_timestamp, parse_rfc3339, RateConfigRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlRateConfigRepository {
    pool: DbPool,
}

impl SqlRateConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateConfigRepository for SqlRateConfigRepository {
    async fn ensure(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO rate_config (id, currency, updated_at)
            VALUES (1, 'COP', ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self) -> Result<RateConfig, RepositoryError> {
        self.ensure().await?;
        let row = sqlx::query(
            r#"
            SELECT
                machine_hourly_rate, labor_per_minute, overhead_fixed, overhead_percent,
                failure_rate_percent, tax_percent, currency, updated_at
            FROM rate_config
            WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        rate_config_from_row(&row)
    }

    async fn update(&self, config: RateConfig) -> Result<RateConfig, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO rate_config (
                id, machine_hourly_rate, labor_per_minute, overhead_fixed, overhead_percent,
                failure_rate_percent, tax_percent, currency, updated_at
            ) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                machine_hourly_rate = excluded.machine_hourly_rate,
                labor_per_minute = excluded.labor_per_minute,
                overhead_fixed = excluded.overhead_fixed,
                overhead_percent = excluded.overhead_percent,
                failure_rate_percent = excluded.failure_rate_percent,
                tax_percent = excluded.tax_percent,
                currency = excluded.currency,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(config.machine_hourly_rate.to_string())
        .bind(config.labor_per_minute.to_string())
        .bind(config.overhead_fixed.to_string())
        .bind(config.overhead_percent.to_string())
        .bind(config.failure_rate_percent.to_string())
        .bind(config.tax_percent.to_string())
        .bind(&config.currency)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get().await
    }
}

fn rate_config_from_row(row: &SqliteRow) -> Result<RateConfig, RepositoryError> {
    let updated_at: String = row.try_get("updated_at")?;
    Ok(RateConfig {
        machine_hourly_rate: decimal_column(row, "machine_hourly_rate")?,
        labor_per_minute: decimal_column(row, "labor_per_minute")?,
        overhead_fixed: decimal_column(row, "overhead_fixed")?,
        overhead_percent: decimal_column(row, "overhead_percent")?,
        failure_rate_percent: decimal_column(row, "failure_rate_percent")?,
        tax_percent: decimal_column(row, "tax_percent")?,
        currency: row.try_get("currency")?,
        updated_at: Some(parse_rfc3339("rate_config updated_at", &updated_at)?),
    })
}
