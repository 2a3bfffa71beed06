//! Request governance: per-caller admission control.

mod rate_limiter;

pub use rate_limiter::{
    rate_limit_key, Admission, RateLimitConfig, RateLimiter, MAX_WINDOW, UNKNOWN_CALLER_KEY,
};
