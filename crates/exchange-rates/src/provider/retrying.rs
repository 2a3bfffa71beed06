//! Upstream fetcher that retries transient failures.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::ExchangeRateError;
use crate::models::RateRecord;
use crate::provider::retry::{retry_with_policy, RetryPolicy};
use crate::provider::RateSource;

/// Wraps a [`RateSource`] with a [`RetryPolicy`].
///
/// Only errors classified [`RetryClass::WithBackoff`](crate::errors::RetryClass::WithBackoff)
/// consume retry budget; everything else is returned on the first failure.
#[derive(Clone)]
pub struct RetryingFetcher {
    source: Arc<dyn RateSource>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(source: Arc<dyn RateSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch records for `filter`, retrying transient upstream failures.
    pub async fn fetch(&self, filter: &str) -> Result<Vec<RateRecord>, ExchangeRateError> {
        let source = self.source.as_ref();
        let result = retry_with_policy(
            &self.policy,
            || source.fetch_rates(filter),
            ExchangeRateError::is_retryable,
        )
        .await;

        match &result {
            Ok(records) => debug!(
                provider = source.id(),
                count = records.len(),
                "Fetched rate records"
            ),
            Err(e) if e.is_retryable() => warn!(
                provider = source.id(),
                attempts = self.policy.attempts(),
                error = %e,
                "Upstream still failing after retries"
            ),
            Err(e) => warn!(provider = source.id(), error = %e, "Upstream call failed"),
        }
        result
    }
}
