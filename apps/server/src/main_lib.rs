use std::sync::Arc;

use crate::{
    config::Config,
    store::{InMemoryTransactionStore, TransactionStore},
};
use purchasefx_exchange_rates::{
    governance::MAX_WINDOW, ExchangeRateService, RateLimiter, RateSource,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub exchange_rates: Arc<ExchangeRateService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub transactions: Arc<dyn TransactionStore>,
}

pub fn init_tracing() {
    let fmt_layer = fmt::layer().json();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Wire the production state: Treasury provider, limiter, in-memory store.
pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let exchange_rates = ExchangeRateService::from_config(&config.exchange_rates)?;
    Ok(assemble(config, exchange_rates))
}

/// Same as [`build_state`] but with a caller-supplied rate source.
pub fn build_state_with_source(config: &Config, source: Arc<dyn RateSource>) -> Arc<AppState> {
    let exchange_rates = ExchangeRateService::with_source(source, &config.exchange_rates);
    assemble(config, exchange_rates)
}

fn assemble(config: &Config, exchange_rates: ExchangeRateService) -> Arc<AppState> {
    let rate_limit = &config.exchange_rates.rate_limit;
    tracing::info!(
        enabled = rate_limit.enabled,
        requests = rate_limit.requests,
        duration_seconds = rate_limit.duration_seconds,
        "Rate limiting configured"
    );
    if rate_limit.duration_seconds > MAX_WINDOW.as_secs() {
        tracing::warn!(
            duration_seconds = rate_limit.duration_seconds,
            max_seconds = MAX_WINDOW.as_secs(),
            "Rate limit window clamped"
        );
    }

    Arc::new(AppState {
        exchange_rates: Arc::new(exchange_rates),
        rate_limiter: Arc::new(RateLimiter::new(rate_limit.clone())),
        transactions: Arc::new(InMemoryTransactionStore::new()),
    })
}
