use std::sync::Arc;

use printquote_core::config::{AppConfig, ConfigError};
use printquote_core::errors::ApplicationError;
use printquote_db::repositories::RepositoryError;
use printquote_db::{connect_from_config, migrations, seed_defaults, DbPool, QuoteService};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<QuoteService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("startup seed failed: {0}")]
    Seed(#[source] RepositoryError),
    #[error("quote service unavailable: {0}")]
    Service(#[source] ApplicationError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        env = ?config.app.env,
        "starting application bootstrap"
    );

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    if config.app.run_migrations_on_start {
        migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
        info!(
            event_name = "system.bootstrap.migrations_applied",
            correlation_id = "bootstrap",
            "database migrations applied"
        );
    }

    if config.app.seed_on_start {
        let report = seed_defaults(&db_pool).await.map_err(BootstrapError::Seed)?;
        info!(
            event_name = "system.bootstrap.seeded",
            correlation_id = "bootstrap",
            inserted = report.inserted,
            "startup seed applied"
        );
    }

    let service =
        Arc::new(QuoteService::from_pool(db_pool.clone()).map_err(BootstrapError::Service)?);

    Ok(Application { config, db_pool, service })
}
