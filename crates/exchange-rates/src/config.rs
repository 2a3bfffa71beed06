//! Typed configuration for the exchange-rate subsystem.
//!
//! Every struct has sensible defaults and deserializes from camelCase keys,
//! so callers can embed it in whatever configuration source they use.

use std::time::Duration;

use serde::Deserialize;

pub use crate::governance::RateLimitConfig;
pub use crate::provider::RetryPolicy;

/// Fiscal Data "rates of exchange" endpoint.
pub const DEFAULT_TREASURY_BASE_URL: &str =
    "https://api.fiscaldata.treasury.gov/services/api/fiscal_service/v1/accounting/od/rates_of_exchange";

/// Months searched backwards from the purchase date.
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 6;

/// Upstream request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Treasury client settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreasuryConfig {
    pub base_url: String,
    pub lookback_months: u32,
    pub timeout_ms: u64,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TREASURY_BASE_URL.to_string(),
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl TreasuryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Everything needed to assemble an [`ExchangeRateService`](crate::ExchangeRateService)
/// and its [`RateLimiter`](crate::RateLimiter).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExchangeRateConfig {
    pub treasury: TreasuryConfig,
    pub retry: RetryPolicy,
    pub rate_limit: RateLimitConfig,
}

impl ExchangeRateConfig {
    /// Upper bound on one rate lookup against a hung upstream: every attempt
    /// runs into the client timeout and every retry delay is waited out.
    pub fn upstream_budget(&self) -> Duration {
        self.retry.worst_case(self.treasury.timeout())
    }
}
