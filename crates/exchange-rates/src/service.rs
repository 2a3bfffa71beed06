//! Exchange-rate service facade.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use crate::config::ExchangeRateConfig;
use crate::errors::ExchangeRateError;
use crate::models::{ConvertedAmount, RateQuote, RateWindow};
use crate::provider::{RateSource, RetryingFetcher, TreasuryProvider};
use crate::resolver::{RateCache, WindowedRateResolver};

/// Entry point used by the HTTP layer: resolve a rate, or resolve and convert.
pub struct ExchangeRateService {
    resolver: WindowedRateResolver,
    cache: Arc<RateCache>,
}

impl ExchangeRateService {
    /// Assemble the service around the Treasury provider.
    pub fn from_config(config: &ExchangeRateConfig) -> Result<Self, ExchangeRateError> {
        let provider = TreasuryProvider::new(&config.treasury)?;
        info!(
            base_url = provider.base_url(),
            lookback_months = config.treasury.lookback_months,
            max_attempts = config.retry.attempts(),
            "Exchange rate service configured"
        );
        Ok(Self::with_source(Arc::new(provider), config))
    }

    /// Assemble the service around any rate source.
    pub fn with_source(source: Arc<dyn RateSource>, config: &ExchangeRateConfig) -> Self {
        let cache = Arc::new(RateCache::new());
        let fetcher = RetryingFetcher::new(source, config.retry.clone());
        let resolver =
            WindowedRateResolver::new(fetcher, cache.clone(), config.treasury.lookback_months);
        Self { resolver, cache }
    }

    pub async fn resolve_rate(
        &self,
        currency: &str,
        purchase_date: NaiveDate,
    ) -> Result<RateQuote, ExchangeRateError> {
        self.resolver.resolve(currency, purchase_date).await
    }

    /// Resolve the rate for `currency` on `purchase_date` and convert `amount_usd` with it.
    pub async fn convert_amount(
        &self,
        amount_usd: Decimal,
        currency: &str,
        purchase_date: NaiveDate,
    ) -> Result<ConvertedAmount, ExchangeRateError> {
        let quote = self.resolve_rate(currency, purchase_date).await?;
        ConvertedAmount::from_quote(amount_usd, quote)
    }

    pub fn window_for(&self, purchase_date: NaiveDate) -> RateWindow {
        self.resolver.window_for(purchase_date)
    }

    /// Number of memoized or in-flight lookups.
    pub fn cached_lookups(&self) -> usize {
        self.cache.len()
    }
}
