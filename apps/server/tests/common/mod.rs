#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use chrono::NaiveDate;
use purchasefx_exchange_rates::{ExchangeRateError, RateRecord, RateSource, RetryPolicy};
use purchasefx_server::{api::app_router, build_state_with_source, config::Config};
use rust_decimal::Decimal;

/// Upstream stand-in: answers every filter with the same result.
pub struct StubSource {
    answer: Result<Vec<RateRecord>, ExchangeRateError>,
    latency: Option<Duration>,
    calls: AtomicU32,
}

impl StubSource {
    pub fn with_rate(record_date: NaiveDate, rate: Decimal) -> Self {
        Self::answering(Ok(vec![RateRecord {
            record_date,
            country_currency_desc: None,
            exchange_rate: rate,
        }]))
    }

    pub fn answering(answer: Result<Vec<RateRecord>, ExchangeRateError>) -> Self {
        Self {
            answer,
            latency: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Every call waits `latency` before answering, like a hung upstream that
    /// only gives up at its client timeout.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for StubSource {
    fn id(&self) -> &'static str {
        "STUB"
    }

    async fn fetch_rates(&self, _filter: &str) -> Result<Vec<RateRecord>, ExchangeRateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.answer.clone()
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.exchange_rates.retry = RetryPolicy::fixed(3, Duration::from_millis(1));
    config
}

pub fn router_with(config: &Config, source: Arc<StubSource>) -> Router {
    let state = build_state_with_source(config, source);
    app_router(state, config)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
