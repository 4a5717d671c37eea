use std::{sync::Arc, time::Duration};

use engine::{AllocationPolicy, AllocationStrategy, FixedRateProvider, HttpRateProvider, RateProvider};
use migration::{Migrator, MigratorTrait};
use settings::Database;

use crate::error::Result;

mod error;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "finora={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect(&settings.server.database).await?;

    let engine = engine::Engine::builder()
        .database(db.clone())
        .rate_provider(rate_provider(&settings.rates)?)
        .allocation(allocation_policy(&settings.allocation)?)
        .build()
        .await?;

    // Effects left pending by a previous run are retried before serving.
    let run = engine.run_pending_effects().await?;
    if run.failed > 0 {
        tracing::warn!(failed = run.failed, "some side effects are still pending");
    }

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, db, listener).await?;

    Ok(())
}

async fn connect(config: &Database) -> Result<sea_orm::DatabaseConnection> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

fn rate_provider(config: &settings::Rates) -> Result<Arc<dyn RateProvider>> {
    match config.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            tracing::info!(base_url = %config.base_url, "using live exchange rates");
            let provider = HttpRateProvider::new(
                &config.base_url,
                key,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
        None => {
            tracing::warn!("no rates.api_key configured, only base currency amounts are accepted");
            Ok(Arc::new(FixedRateProvider::new()))
        }
    }
}

fn allocation_policy(config: &settings::Allocation) -> Result<AllocationPolicy> {
    Ok(AllocationPolicy {
        rate_bps: config.rate_bps,
        strategy: AllocationStrategy::try_from(config.strategy.as_str())?,
        max_total_bps: config.max_total_bps,
    })
}
