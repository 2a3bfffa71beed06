//! PurchaseFX Exchange Rates Crate
//!
//! Historical exchange-rate resolution and request governance for converting
//! USD purchase amounts into a target currency.
//!
//! # Overview
//!
//! The crate supports:
//! - Per-caller token bucket admission control
//! - Upstream rate fetching with transient-failure retry
//! - Lookback-window resolution against the US Treasury rates dataset
//! - Single-flight memoization of resolved rates
//! - Banker's-rounded currency conversion
//!
//! # Architecture
//!
//! ```text
//!                          +----------------------+
//!   inbound request -----> |     RateLimiter      |  (per-key token bucket)
//!                          +----------------------+
//!                                     |
//!                                     v
//!                          +----------------------+
//!                          | WindowedRateResolver |  (lookback window, first match)
//!                          +----------------------+
//!                                     |
//!                                     v
//!                          +----------------------+
//!                          |  SingleFlightCache   |  (one flight per key)
//!                          +----------------------+
//!                                     |
//!                                     v
//!                          +----------------------+
//!                          |   RetryingFetcher    |  (retry transient errors)
//!                          +----------------------+
//!                                     |
//!                                     v
//!                          +----------------------+
//!                          |      RateSource      |  (Treasury HTTP API)
//!                          +----------------------+
//! ```
//!
//! # Core Types
//!
//! - [`RateLookupKey`] - `(currency, purchase_date)` identity of a lookup
//! - [`RateWindow`] - Searched date range
//! - [`RateQuote`] - Resolved, strictly positive rate
//! - [`ExchangeRateError`] - Error for every operation

pub mod cache;
pub mod config;
pub mod errors;
pub mod governance;
pub mod models;
pub mod provider;
pub mod resolver;
pub mod service;

pub use cache::SingleFlightCache;
pub use config::{ExchangeRateConfig, TreasuryConfig};
pub use errors::{ExchangeRateError, RetryClass};
pub use governance::{rate_limit_key, Admission, RateLimitConfig, RateLimiter};
pub use models::{
    convert, normalize_amount, ConvertedAmount, RateLookupKey, RateQuote, RateRecord, RateWindow,
};
pub use provider::{RateSource, RetryPolicy, RetryingFetcher, TreasuryProvider};
pub use resolver::{build_filter, RateCache, WindowedRateResolver};
pub use service::ExchangeRateService;
