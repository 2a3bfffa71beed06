use std::collections::BTreeMap;

use chrono::NaiveDate;
use purchasefx_exchange_rates::{normalize_amount, ConvertedAmount, RateQuote, RateWindow};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{NewTransaction, Transaction};

pub const DESCRIPTION_MAX_CHARS: usize = 50;

/// Smallest purchase amount accepted, in USD.
pub fn min_purchase_amount() -> Decimal {
    Decimal::new(1, 2)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub purchase_amount_usd: Option<Decimal>,
}

impl TransactionRequest {
    /// Check every field, collecting one message per invalid field.
    pub fn validate(self) -> Result<NewTransaction, BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();

        let description = match self.description {
            Some(d) if d.trim().is_empty() => {
                errors.insert("description".into(), "Description is required".into());
                None
            }
            None => {
                errors.insert("description".into(), "Description is required".into());
                None
            }
            Some(d) if d.chars().count() > DESCRIPTION_MAX_CHARS => {
                errors.insert(
                    "description".into(),
                    format!("Description must not exceed {DESCRIPTION_MAX_CHARS} characters"),
                );
                None
            }
            Some(d) => Some(d),
        };

        if self.transaction_date.is_none() {
            errors.insert(
                "transactionDate".into(),
                "Transaction date is required".into(),
            );
        }

        let amount = match self.purchase_amount_usd {
            None => {
                errors.insert(
                    "purchaseAmountUsd".into(),
                    "Purchase amount is required".into(),
                );
                None
            }
            Some(a) if a < min_purchase_amount() => {
                errors.insert("purchaseAmountUsd".into(), "Amount must be positive".into());
                None
            }
            Some(a) => Some(a),
        };

        match (description, self.transaction_date, amount) {
            (Some(description), Some(transaction_date), Some(amount)) if errors.is_empty() => {
                Ok(NewTransaction {
                    description,
                    transaction_date,
                    purchase_amount_usd: normalize_amount(amount),
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCreatedResponse {
    pub id: Uuid,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub purchase_amount_usd: Decimal,
}

impl From<Transaction> for TransactionCreatedResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            description: t.description,
            transaction_date: t.transaction_date,
            purchase_amount_usd: t.purchase_amount_usd,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertQuery {
    pub target_currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedTransactionResponse {
    pub id: Uuid,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub purchase_amount_usd: Decimal,
    pub exchange_rate: Decimal,
    pub converted_amount: Decimal,
    pub target_currency: String,
}

impl ConvertedTransactionResponse {
    pub fn new(transaction: Transaction, converted: ConvertedAmount, target_currency: String) -> Self {
        Self {
            id: transaction.id,
            description: transaction.description,
            transaction_date: transaction.transaction_date,
            purchase_amount_usd: transaction.purchase_amount_usd,
            exchange_rate: converted.quote.rate,
            converted_amount: converted.converted,
            target_currency,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRateQuery {
    pub currency: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateResponse {
    pub currency: String,
    pub purchase_date: NaiveDate,
    pub record_date: NaiveDate,
    pub exchange_rate: Decimal,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

impl ExchangeRateResponse {
    pub fn new(currency: String, purchase_date: NaiveDate, quote: RateQuote, window: RateWindow) -> Self {
        Self {
            currency,
            purchase_date,
            record_date: quote.record_date,
            exchange_rate: quote.rate,
            window_start: window.start,
            window_end: window.end,
        }
    }
}
