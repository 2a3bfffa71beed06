//! Rate source trait definition.

use async_trait::async_trait;

use crate::errors::ExchangeRateError;
use crate::models::RateRecord;

/// A service publishing historical exchange-rate records.
///
/// The production implementation is [`TreasuryProvider`](super::treasury::TreasuryProvider);
/// the trait exists so tests can substitute the upstream.
///
/// Implementations issue exactly one upstream request per call and classify
/// failures into [`ExchangeRateError::UpstreamTransient`] or
/// [`ExchangeRateError::UpstreamFatal`]. Retrying is the caller's job.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Identifier used in logs (e.g. "TREASURY").
    fn id(&self) -> &'static str;

    /// Fetch the records matching `filter`, newest first.
    ///
    /// An empty list is a valid "no rate" answer, distinct from a failure.
    async fn fetch_rates(&self, filter: &str) -> Result<Vec<RateRecord>, ExchangeRateError>;
}
