//! Upstream rate sources and the retrying fetcher in front of them.

pub mod retry;
mod retrying;
mod traits;
pub mod treasury;

pub use retry::{retry_with_policy, Backoff, RetryPolicy};
pub use retrying::RetryingFetcher;
pub use traits::RateSource;
pub use treasury::TreasuryProvider;
