//! Currency conversion arithmetic.
//!
//! All monetary results are rounded to 2 decimal places with banker's
//! rounding (ties to even).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::ExchangeRateError;
use crate::models::RateQuote;

/// Decimal places kept on monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to cents, ties to even.
pub fn normalize_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Convert a USD amount with `rate` (target units per USD).
///
/// Returns [`ExchangeRateError::Internal`] if the product does not fit a `Decimal`.
pub fn convert(amount_usd: Decimal, rate: Decimal) -> Result<Decimal, ExchangeRateError> {
    amount_usd
        .checked_mul(rate)
        .map(normalize_amount)
        .ok_or_else(|| {
            ExchangeRateError::Internal(format!(
                "Conversion overflow: {} x {}",
                amount_usd, rate
            ))
        })
}

/// A USD amount together with the quote used and the converted result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedAmount {
    pub amount_usd: Decimal,
    pub quote: RateQuote,
    pub converted: Decimal,
}

impl ConvertedAmount {
    pub fn from_quote(amount_usd: Decimal, quote: RateQuote) -> Result<Self, ExchangeRateError> {
        Ok(Self {
            amount_usd,
            quote,
            converted: convert(amount_usd, quote.rate)?,
        })
    }
}
