//! Exchange rates and conversion to the base ledger currency.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Currency, EngineError, ResultEngine};

/// Default timeout of a single rate lookup.
pub const DEFAULT_RATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of conversion tables.
///
/// `rates(source)` returns how many units of each currency one unit of
/// `source` buys, keyed by upper-case currency code.
#[async_trait]
pub trait RateProvider: Send + Sync + fmt::Debug {
    async fn rates(&self, source: &Currency) -> ResultEngine<HashMap<String, f64>>;
}

/// Client of an exchangerate-api v6 compatible service.
///
/// Requests `GET {base_url}/{api_key}/latest/{SOURCE}`.
#[derive(Clone)]
pub struct HttpRateProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for HttpRateProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRateProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

impl LatestRates {
    fn into_table(self) -> ResultEngine<HashMap<String, f64>> {
        if self.result != "success" {
            let reason = self.error_type.unwrap_or(self.result);
            return Err(EngineError::Upstream(format!(
                "rate provider answered: {reason}"
            )));
        }
        Ok(self.conversion_rates)
    }
}

impl HttpRateProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> ResultEngine<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::Upstream(format!("cannot build http client: {err}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn rates(&self, source: &Currency) -> ResultEngine<HashMap<String, f64>> {
        let endpoint = format!("{}/{}/latest/{}", self.base_url, self.api_key, source);
        tracing::debug!(%source, "fetching exchange rates");

        let res = self.http.get(endpoint).send().await.map_err(|err| {
            tracing::warn!("rate provider unreachable: {err}");
            EngineError::Upstream(format!("rate provider unreachable: {}", err.without_url()))
        })?;

        let status = res.status();
        if !status.is_success() {
            tracing::warn!(%status, %source, "rate provider returned an error status");
            return Err(EngineError::Upstream(format!(
                "rate provider returned {status}"
            )));
        }

        let body = res
            .json::<LatestRates>()
            .await
            .map_err(|err| EngineError::Upstream(format!("malformed rate response: {}", err.without_url())))?;
        body.into_table()
    }
}

/// Static rate table, used offline and in tests.
#[derive(Clone, Debug, Default)]
pub struct FixedRateProvider {
    tables: HashMap<String, HashMap<String, f64>>,
}

impl FixedRateProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One unit of `source` buys `rate` units of `target`.
    #[must_use]
    pub fn with_rate(mut self, source: &Currency, target: &Currency, rate: f64) -> Self {
        self.tables
            .entry(source.code().to_string())
            .or_default()
            .insert(target.code().to_string(), rate);
        self
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn rates(&self, source: &Currency) -> ResultEngine<HashMap<String, f64>> {
        let mut table = self.tables.get(source.code()).cloned().unwrap_or_default();
        table.entry(source.code().to_string()).or_insert(1.0);
        Ok(table)
    }
}

/// Converts entered amounts into the base ledger currency.
#[derive(Clone, Debug)]
pub struct CurrencyConverter {
    provider: Arc<dyn RateProvider>,
}

impl CurrencyConverter {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self { provider }
    }

    /// Units of `target` bought by one unit of `base`.
    pub async fn exchange_rate(&self, base: &Currency, target: &Currency) -> ResultEngine<f64> {
        if base == target {
            return Ok(1.0);
        }
        let table = self.provider.rates(base).await?;
        table
            .get(target.code())
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .ok_or_else(|| EngineError::RateUnavailable(format!("no rate from {base} to {target}")))
    }

    /// Converts `amount_minor` of `source` into base-currency minor units.
    ///
    /// Base-currency amounts are returned unchanged without a lookup. Other
    /// amounts are multiplied by the rate and rounded half away from zero;
    /// a result that rounds to zero is rejected.
    pub async fn convert(&self, amount_minor: i64, source: &Currency) -> ResultEngine<i64> {
        if source.is_base() {
            return Ok(amount_minor);
        }
        let rate = self.exchange_rate(source, &Currency::base()).await?;
        let converted = (amount_minor as f64 * rate).round();
        if !converted.is_finite() || converted >= i64::MAX as f64 {
            return Err(EngineError::InvalidAmount(format!(
                "converted amount out of range for {amount_minor} {source}"
            )));
        }
        if converted <= 0.0 {
            return Err(EngineError::InvalidAmount(format!(
                "{amount_minor} {source} converts to zero {}",
                Currency::base()
            )));
        }
        Ok(converted as i64)
    }
}
