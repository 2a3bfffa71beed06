//! Lookback-window rate resolution.
//!
//! Given a currency and purchase date, the resolver asks the upstream for
//! the newest record in `[purchase_date - lookback, purchase_date]`. The
//! upstream sorts by record date descending and returns a single row, so
//! the first record is authoritative. Results are memoized per
//! `(currency, purchase_date)` through the single-flight cache.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::cache::SingleFlightCache;
use crate::errors::ExchangeRateError;
use crate::models::{RateLookupKey, RateQuote, RateRecord, RateWindow};
use crate::provider::RetryingFetcher;

/// Cache of resolved quotes shared by every resolution.
pub type RateCache = SingleFlightCache<RateLookupKey, RateQuote, ExchangeRateError>;

/// Resolves the authoritative rate for a purchase.
pub struct WindowedRateResolver {
    fetcher: RetryingFetcher,
    cache: Arc<RateCache>,
    lookback_months: u32,
}

impl WindowedRateResolver {
    pub fn new(fetcher: RetryingFetcher, cache: Arc<RateCache>, lookback_months: u32) -> Self {
        Self {
            fetcher,
            cache,
            lookback_months,
        }
    }

    pub fn lookback_months(&self) -> u32 {
        self.lookback_months
    }

    /// Window searched for a purchase made on `purchase_date`.
    pub fn window_for(&self, purchase_date: NaiveDate) -> RateWindow {
        RateWindow::ending_on(purchase_date, self.lookback_months)
    }

    /// Resolve the rate for `currency` on `purchase_date`.
    ///
    /// Concurrent calls for the same pair share one upstream fetch. Upstream
    /// errors are passed through untouched; only transient ones were retried
    /// by the fetcher.
    pub async fn resolve(
        &self,
        currency: &str,
        purchase_date: NaiveDate,
    ) -> Result<RateQuote, ExchangeRateError> {
        let key = RateLookupKey::new(currency, purchase_date);
        let window = self.window_for(purchase_date);
        let fetcher = self.fetcher.clone();
        let currency = currency.to_string();

        self.cache
            .get_or_compute(key, move || async move {
                fetch_quote(&fetcher, &currency, window).await
            })
            .await
    }
}

/// Upstream filter expression for `currency` within `window`.
pub fn build_filter(currency: &str, window: RateWindow) -> String {
    format!(
        "currency:eq:{},record_date:lte:{},record_date:gte:{}",
        currency, window.end, window.start
    )
}

async fn fetch_quote(
    fetcher: &RetryingFetcher,
    currency: &str,
    window: RateWindow,
) -> Result<RateQuote, ExchangeRateError> {
    let records = fetcher.fetch(&build_filter(currency, window)).await?;
    select_quote(currency, window, &records)
}

/// Pick the authoritative quote from the upstream answer.
fn select_quote(
    currency: &str,
    window: RateWindow,
    records: &[RateRecord],
) -> Result<RateQuote, ExchangeRateError> {
    let not_found = || ExchangeRateError::RateNotFound {
        currency: currency.to_string(),
        window,
    };

    let Some(record) = records.first() else {
        warn!(currency, window = %window, "No exchange rate in lookup window");
        return Err(not_found());
    };

    if !window.contains(record.record_date) {
        warn!(
            currency,
            window = %window,
            record_date = %record.record_date,
            "Upstream returned a record outside the lookup window"
        );
        return Err(not_found());
    }

    let quote = RateQuote::try_from(record).map_err(|rate| ExchangeRateError::UpstreamFatal {
        status: None,
        message: format!(
            "Malformed response: non-positive exchange rate {} for '{}'",
            rate, currency
        ),
    })?;

    debug!(
        currency,
        record_date = %quote.record_date,
        rate = %quote.rate,
        "Resolved exchange rate"
    );
    Ok(quote)
}
