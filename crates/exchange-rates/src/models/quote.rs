//! Rate records as published upstream and the validated quote handed to callers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single record returned by a rate source, before validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    pub record_date: NaiveDate,
    /// Country and currency description (e.g. "Euro Zone-Euro").
    pub country_currency_desc: Option<String>,
    pub exchange_rate: Decimal,
}

/// An authoritative historical exchange rate.
///
/// Immutable once obtained; `rate` is always strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub record_date: NaiveDate,
    pub rate: Decimal,
}

impl RateQuote {
    /// Returns `None` when `rate` is zero or negative.
    pub fn new(record_date: NaiveDate, rate: Decimal) -> Option<Self> {
        (rate > Decimal::ZERO).then_some(Self { record_date, rate })
    }
}

impl TryFrom<&RateRecord> for RateQuote {
    type Error = Decimal;

    /// Fails with the offending rate when it is not positive.
    fn try_from(record: &RateRecord) -> Result<Self, Self::Error> {
        RateQuote::new(record.record_date, record.exchange_rate).ok_or(record.exchange_rate)
    }
}
