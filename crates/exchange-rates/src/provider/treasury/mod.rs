//! US Treasury "rates of exchange" provider.
//!
//! Calls the Fiscal Data API:
//! `GET <base_url>?filter=...&sort=-record_date&page[size]=1`
//!
//! The dataset is published quarterly, so the most recent record inside a
//! lookback window is the rate that applied on the purchase date.
//! API documentation: https://fiscaldata.treasury.gov/datasets/treasury-reporting-rates-exchange/

mod models;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::TreasuryConfig;
use crate::errors::ExchangeRateError;
use crate::models::RateRecord;
use crate::provider::RateSource;

use models::TreasuryResponse;

const PROVIDER_ID: &str = "TREASURY";

/// Sort order requested from the dataset: newest record first.
const SORT_NEWEST_FIRST: &str = "-record_date";

/// Only the newest matching record is ever used.
const PAGE_SIZE: &str = "1";

/// Treasury exchange-rate provider.
pub struct TreasuryProvider {
    client: Client,
    base_url: String,
}

impl TreasuryProvider {
    /// Create a provider from configuration.
    pub fn new(config: &TreasuryConfig) -> Result<Self, ExchangeRateError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ExchangeRateError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Create a provider around an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RateSource for TreasuryProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_rates(&self, filter: &str) -> Result<Vec<RateRecord>, ExchangeRateError> {
        debug!(provider = PROVIDER_ID, filter, "Calling Treasury API");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("filter", filter),
                ("sort", SORT_NEWEST_FIRST),
                ("page[size]", PAGE_SIZE),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ExchangeRateError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeRateError::from_transport(&e))?;

        if !status.is_success() {
            return Err(ExchangeRateError::from_status(status, &body));
        }

        let parsed: TreasuryResponse =
            serde_json::from_str(&body).map_err(|e| ExchangeRateError::UpstreamFatal {
                status: Some(status.as_u16()),
                message: format!("Malformed response body: {}", e),
            })?;

        let records = parsed.into_records();
        debug!(
            provider = PROVIDER_ID,
            count = records.len(),
            "Treasury API returned records"
        );
        Ok(records)
    }
}
