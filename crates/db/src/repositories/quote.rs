use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use printquote_core::domain::quote::{
    NewQuote, QuoteDetail, QuoteDetailItem, QuoteId, QuoteSummary,
};
use printquote_core::snapshot::{encode_snapshot, SnapshotDecoder};

use super::{
    bool_flag, decimal_column, format_timestamp, parse_rfc3339, QuoteRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlQuoteRepository {
    pool: DbPool,
    decoder: SnapshotDecoder,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, decoder: SnapshotDecoder::default() }
    }

    /// Reads snapshots through a custom alias table.
    pub fn with_decoder(pool: DbPool, decoder: SnapshotDecoder) -> Self {
        Self { pool, decoder }
    }
}

#[async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn create(&self, quote: NewQuote) -> Result<QuoteId, RepositoryError> {
        if quote.items.is_empty() {
            return Err(RepositoryError::Constraint(
                "a quote needs at least one line item".to_string(),
            ));
        }
        let documents = encode_snapshot(&quote.result)?;

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO quotes (
                created_at, title, notes, waste_percent, margin_percent, tax_enabled,
                tax_percent_snapshot, currency, shipping_rate_id, packaging_rate_id,
                totals_json, breakdown_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(format_timestamp(quote.created_at))
        .bind(&quote.title)
        .bind(&quote.notes)
        .bind(quote.waste_percent.to_string())
        .bind(quote.margin_percent.to_string())
        .bind(i64::from(quote.tax_enabled))
        .bind(quote.tax_percent.to_string())
        .bind(&quote.currency)
        .bind(quote.shipping_rate_id)
        .bind(quote.packaging_rate_id)
        .bind(&documents.totals_json)
        .bind(&documents.breakdown_json)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for item in &quote.items {
            sqlx::query(
                r#"
                INSERT INTO quote_items (
                    quote_id, material_id, grams, print_minutes, labor_minutes, quantity
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(item.material_id)
            .bind(item.grams.to_string())
            .bind(item.print_minutes.to_string())
            .bind(item.labor_minutes.to_string())
            .bind(item.quantity.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(event_name = "quote.created", quote_id = id, items = quote.items.len());
        Ok(QuoteId(id))
    }

    async fn find_detail(&self, id: QuoteId) -> Result<Option<QuoteDetail>, RepositoryError> {
        let Some(header) = sqlx::query(
            r#"
            SELECT
                id, created_at, title, notes, waste_percent, margin_percent, tax_enabled,
                tax_percent_snapshot, currency, shipping_rate_id, packaging_rate_id,
                totals_json, breakdown_json
            FROM quotes
            WHERE id = ?
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query(
            r#"
            SELECT
                qi.material_id, COALESCE(m.name, '') AS material_name, qi.grams,
                qi.print_minutes, qi.labor_minutes, qi.quantity
            FROM quote_items qi
            LEFT JOIN materials m ON m.id = qi.material_id
            WHERE qi.quote_id = ?
            ORDER BY qi.id ASC
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(detail_item_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let breakdown_json: String = header.try_get("breakdown_json")?;
        let totals_json: String = header.try_get("totals_json")?;
        let snapshot = self.decoder.decode(&breakdown_json, &totals_json);
        let created_at: String = header.try_get("created_at")?;

        Ok(Some(QuoteDetail {
            id: QuoteId(header.try_get("id")?),
            created_at: parse_rfc3339("quote created_at", &created_at)?,
            title: header.try_get("title")?,
            notes: header.try_get("notes")?,
            waste_percent: decimal_column(&header, "waste_percent")?,
            margin_percent: decimal_column(&header, "margin_percent")?,
            tax_enabled: bool_flag("tax_enabled", header.try_get("tax_enabled")?)?,
            tax_percent: decimal_column(&header, "tax_percent_snapshot")?,
            currency: header.try_get("currency")?,
            shipping_rate_id: header.try_get("shipping_rate_id")?,
            packaging_rate_id: header.try_get("packaging_rate_id")?,
            items,
            breakdown: snapshot.breakdown,
            totals: snapshot.totals,
            schema_version: snapshot.schema_version,
        }))
    }

    async fn list(&self, search: &str) -> Result<Vec<QuoteSummary>, RepositoryError> {
        let search = search.trim();
        let rows = sqlx::query(
            r#"
            SELECT id, created_at, COALESCE(title, '') AS title, totals_json
            FROM quotes
            WHERE (
                ? = ''
                OR instr(COALESCE(title, ''), ?) > 0
                OR instr(COALESCE(notes, ''), ?) > 0
            )
            ORDER BY datetime(created_at) DESC, id DESC
            "#,
        )
        .bind(search)
        .bind(search)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| self.summary_from_row(row)).collect()
    }
}

impl SqlQuoteRepository {
    fn summary_from_row(&self, row: &SqliteRow) -> Result<QuoteSummary, RepositoryError> {
        let created_at: String = row.try_get("created_at")?;
        let totals_json: String = row.try_get("totals_json")?;
        Ok(QuoteSummary {
            id: QuoteId(row.try_get("id")?),
            created_at: parse_rfc3339("quote created_at", &created_at)?,
            title: row.try_get("title")?,
            total: self.decoder.decode_totals(&totals_json).total,
        })
    }
}

fn detail_item_from_row(row: &SqliteRow) -> Result<QuoteDetailItem, RepositoryError> {
    Ok(QuoteDetailItem {
        material_id: row.try_get("material_id")?,
        material_name: row.try_get("material_name")?,
        grams: decimal_column(row, "grams")?,
        print_minutes: decimal_column(row, "print_minutes")?,
        labor_minutes: decimal_column(row, "labor_minutes")?,
        quantity: decimal_column(row, "quantity")?,
    })
}
