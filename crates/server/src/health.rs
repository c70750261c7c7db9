use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use printquote_db::{migrations::MIGRATOR, DbPool};
use serde::Serialize;
use sqlx::Row;
use tracing::warn;

/// Readiness report: the quote store is ready once every bundled migration is
/// applied and the catalog tables answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub schema: SchemaStatus,
    pub store: Option<StoreCounts>,
    pub checked_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    pub applied: usize,
    pub expected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SchemaStatus {
    fn is_current(&self) -> bool {
        self.error.is_none() && self.applied >= self.expected
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub active_materials: i64,
    pub saved_quotes: i64,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(readiness)).with_state(db_pool)
}

pub async fn readiness(State(pool): State<DbPool>) -> (StatusCode, Json<Readiness>) {
    let schema = schema_status(&pool).await;
    let store = if schema.is_current() { store_counts(&pool).await } else { None };
    let ready = store.is_some();

    if !ready {
        warn!(
            event_name = "system.health.degraded",
            applied = schema.applied,
            expected = schema.expected,
            "quote store is not ready"
        );
    }

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let payload = Readiness {
        status: if ready { "ready" } else { "degraded" },
        schema,
        store,
        checked_at: Utc::now().to_rfc3339(),
    };
    (status_code, Json(payload))
}

async fn schema_status(pool: &DbPool) -> SchemaStatus {
    let expected =
        MIGRATOR.iter().filter(|migration| !migration.migration_type.is_down_migration()).count();
    let applied = sqlx::query("SELECT COUNT(*) AS applied FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .map(|row| row.get::<i64, _>("applied"));

    match applied {
        Ok(applied) => SchemaStatus {
            applied: usize::try_from(applied).unwrap_or_default(),
            expected,
            error: None,
        },
        Err(error) => SchemaStatus { applied: 0, expected, error: Some(error.to_string()) },
    }
}

async fn store_counts(pool: &DbPool) -> Option<StoreCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM materials WHERE active = 1) AS active_materials,
            (SELECT COUNT(*) FROM quotes) AS saved_quotes
        "#,
    )
    .fetch_one(pool)
    .await;

    match row {
        Ok(row) => Some(StoreCounts {
            active_materials: row.get("active_materials"),
            saved_quotes: row.get("saved_quotes"),
        }),
        Err(error) => {
            warn!(event_name = "system.health.store_failed", error = %error, "store query failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use printquote_db::{connect_with_settings, migrations, seed_defaults};

    use super::readiness;

    #[tokio::test]
    async fn migrated_and_seeded_store_is_ready() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        seed_defaults(&pool).await.expect("seed");

        let (status, Json(payload)) = readiness(State(pool.clone())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.schema.applied, payload.schema.expected);
        let store = payload.store.expect("store counts");
        assert!(store.active_materials > 0);
        assert_eq!(store.saved_quotes, 0);

        pool.close().await;
    }

    #[tokio::test]
    async fn unmigrated_store_is_unavailable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");

        let (status, Json(payload)) = readiness(State(pool.clone())).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert!(payload.schema.error.is_some());
        assert_eq!(payload.store, None);

        pool.close().await;
    }

    #[tokio::test]
    async fn closed_pool_is_unavailable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool.close().await;

        let (status, Json(payload)) = readiness(State(pool)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.store, None);
    }
}
