//! Wire structures for the Treasury "rates of exchange" dataset.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::models::RateRecord;

/// Response envelope. `data` may be missing or null, both meaning "no rate".
#[derive(Debug, Deserialize)]
pub(crate) struct TreasuryResponse {
    #[serde(default)]
    pub data: Option<Vec<TreasuryRate>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreasuryRate {
    pub record_date: NaiveDate,
    #[serde(default)]
    pub country_currency_desc: Option<String>,
    #[serde(deserialize_with = "decimal_from_str_or_number")]
    pub exchange_rate: Decimal,
}

impl From<TreasuryRate> for RateRecord {
    fn from(rate: TreasuryRate) -> Self {
        RateRecord {
            record_date: rate.record_date,
            country_currency_desc: rate.country_currency_desc,
            exchange_rate: rate.exchange_rate,
        }
    }
}

impl TreasuryResponse {
    pub fn into_records(self) -> Vec<RateRecord> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .map(RateRecord::from)
            .collect()
    }
}

/// The dataset publishes numbers as strings ("0.9"), but numeric JSON is accepted too.
fn decimal_from_str_or_number<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    let text = match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    };
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(serde::de::Error::custom)
}
