//! Data types shared across the limiter, fetcher, resolver and cache.

pub mod conversion;
mod lookup;
mod quote;

pub use conversion::{convert, normalize_amount, ConvertedAmount};
pub use lookup::{RateLookupKey, RateWindow};
pub use quote::{RateQuote, RateRecord};
