//! Error types and retry classification for the exchange-rate crate.
//!
//! This module provides:
//! - [`ExchangeRateError`]: The error enum for every rate operation
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

use crate::models::RateWindow;

/// Errors that can occur while governing, fetching, resolving or converting rates.
///
/// The type is `Clone` so that a single failed upstream computation can be
/// handed to every caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeRateError {
    /// The caller exceeded its request quota.
    /// Surfaced immediately, never retried internally.
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Seconds until the caller may try again (at least 1)
        retry_after_secs: u64,
    },

    /// Connection failure, timeout, or 5xx from the rate service.
    /// Retried with backoff until the attempt budget is spent.
    #[error("Upstream rate service unavailable: {message}")]
    UpstreamTransient {
        /// Description of the last failure
        message: String,
    },

    /// 4xx or unparsable response from the rate service.
    /// Not retried.
    #[error("Upstream rate service rejected the request: {message}")]
    UpstreamFatal {
        /// HTTP status, when the failure came from a response
        status: Option<u16>,
        /// Description of the failure
        message: String,
    },

    /// The rate service answered, but no record fell inside the lookback window.
    #[error(
        "No exchange rate available for currency '{currency}' within the allowed lookup window ({window})"
    )]
    RateNotFound {
        /// The requested currency
        currency: String,
        /// The searched window
        window: RateWindow,
    },

    /// Any unanticipated failure (numeric overflow, programming error).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExchangeRateError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use purchasefx_exchange_rates::errors::{ExchangeRateError, RetryClass};
    ///
    /// let error = ExchangeRateError::UpstreamTransient { message: "503".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = ExchangeRateError::UpstreamFatal { status: Some(400), message: "bad filter".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::UpstreamTransient { .. } => RetryClass::WithBackoff,

            Self::RateLimitExceeded { .. }
            | Self::UpstreamFatal { .. }
            | Self::RateNotFound { .. }
            | Self::Internal(_) => RetryClass::Never,
        }
    }

    /// Shorthand for `retry_class() == RetryClass::WithBackoff`.
    pub fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::WithBackoff
    }

    /// Builds an error from a transport-level `reqwest` failure.
    ///
    /// Connection problems and timeouts are transient; a body that could not
    /// be decoded is fatal.
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::UpstreamFatal {
                status: err.status().map(|s| s.as_u16()),
                message: format!("Malformed response body: {}", err),
            };
        }
        Self::UpstreamTransient {
            message: if err.is_timeout() {
                format!("Request timed out: {}", err)
            } else {
                format!("Request failed: {}", err)
            },
        }
    }

    /// Builds an error from a non-success HTTP status.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let snippet: String = body.chars().take(200).collect();
        if status.is_server_error() {
            Self::UpstreamTransient {
                message: format!("HTTP {}: {}", status.as_u16(), snippet),
            }
        } else {
            Self::UpstreamFatal {
                status: Some(status.as_u16()),
                message: format!("HTTP {}: {}", status.as_u16(), snippet),
            }
        }
    }
}
