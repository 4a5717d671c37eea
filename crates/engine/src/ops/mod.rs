use std::{collections::HashMap, sync::Arc};

use sea_orm::DatabaseConnection;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    AllocationPolicy, Currency, CurrencyConverter, EngineError, FixedRateProvider, RateProvider,
    ResultEngine, money::BPS_SCALE,
};

mod budgets;
mod effects;
mod goals;
mod notifications;
mod reports;
mod transactions;

pub use transactions::TransactionListFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    converter: CurrencyConverter,
    allocation: AllocationPolicy,
    /// One lock per owner: transaction creation, allocation and effect
    /// processing of a user never interleave.
    owner_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Units of `target` bought by one unit of `base`.
    pub async fn exchange_rate(&self, base: &str, target: &str) -> ResultEngine<f64> {
        let base = Currency::try_from(base)?;
        let target = Currency::try_from(target)?;
        self.converter.exchange_rate(&base, &target).await
    }

    async fn lock_owner(&self, user_id: &str) -> OwnedMutexGuard<()> {
        lock_entry(&self.owner_locks, user_id).await
    }
}

/// Locks the entry for `key`, first dropping entries nobody holds or waits on.
async fn lock_entry(
    locks: &Mutex<HashMap<String, Arc<Mutex<()>>>>,
    key: &str,
) -> OwnedMutexGuard<()> {
    let lock = {
        let mut locks = locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key.to_string()).or_default().clone()
    };
    lock.lock_owned().await
}

fn validate_bps(value: u32, label: &str) -> ResultEngine<()> {
    if i64::from(value) > BPS_SCALE {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be between 0 and {BPS_SCALE} bps, got {value}"
        )));
    }
    Ok(())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    rate_provider: Option<Arc<dyn RateProvider>>,
    allocation: AllocationPolicy,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Source of exchange rates. Without one only the base currency can be
    /// converted.
    pub fn rate_provider(mut self, provider: Arc<dyn RateProvider>) -> EngineBuilder {
        self.rate_provider = Some(provider);
        self
    }

    pub fn allocation(mut self, policy: AllocationPolicy) -> EngineBuilder {
        self.allocation = policy;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        validate_bps(self.allocation.rate_bps, "allocation rate")?;
        if let Some(cap) = self.allocation.max_total_bps {
            validate_bps(cap, "allocation cap")?;
        }
        let provider = self
            .rate_provider
            .unwrap_or_else(|| Arc::new(FixedRateProvider::new()));
        Ok(Engine {
            database: self.database,
            converter: CurrencyConverter::new(provider),
            allocation: self.allocation,
            owner_locks: Mutex::new(HashMap::new()),
        })
    }
}
