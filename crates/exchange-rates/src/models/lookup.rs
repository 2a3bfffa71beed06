//! Lookup identity and lookback window types.

use std::fmt;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identity of a rate lookup, and the key of the rate cache.
///
/// Compared by value on `(currency, purchase_date)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLookupKey {
    /// Currency description as published upstream (e.g. "Euro", "Canada-Dollar").
    pub currency: String,
    /// Date of the purchase being converted.
    pub purchase_date: NaiveDate,
}

impl RateLookupKey {
    pub fn new(currency: impl Into<String>, purchase_date: NaiveDate) -> Self {
        Self {
            currency: currency.into(),
            purchase_date,
        }
    }
}

impl fmt::Display for RateLookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.currency, self.purchase_date)
    }
}

/// Bounded historical date range searched for the most recent rate record.
///
/// Invariant: `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RateWindow {
    /// Builds the window `[end - lookback_months, end]`.
    ///
    /// Calendar months are subtracted; when the day does not exist in the
    /// target month it is clamped to the month's last day
    /// (2024-08-31 minus 6 months is 2024-02-29).
    pub fn ending_on(end: NaiveDate, lookback_months: u32) -> Self {
        let start = end
            .checked_sub_months(Months::new(lookback_months))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Whether `date` falls inside the window, bounds included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for RateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}
