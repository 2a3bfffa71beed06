//! Token bucket admission control for inbound requests.
//!
//! One bucket per caller key (bearer token when authenticated, network
//! address otherwise). A bucket holds `requests` tokens and is topped back up
//! to capacity once every full window. Buckets are created on first use and
//! live for the whole process.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default quota per window.
const DEFAULT_REQUESTS: u32 = 60;

/// Default window length in seconds.
const DEFAULT_DURATION_SECONDS: u64 = 60;

/// Longest window honoured; longer configured windows are clamped to it.
pub const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Key used when a request carries neither a credential nor an address.
pub const UNKNOWN_CALLER_KEY: &str = "unknown";

/// Rate limiter configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// When false every request is admitted.
    pub enabled: bool,
    /// Requests allowed per window (bucket capacity).
    pub requests: u32,
    /// Window length in seconds, between 1 and [`MAX_WINDOW`].
    pub duration_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: DEFAULT_REQUESTS,
            duration_seconds: DEFAULT_DURATION_SECONDS,
        }
    }
}

impl RateLimitConfig {
    fn capacity(&self) -> u32 {
        self.requests.max(1)
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.duration_seconds.max(1)).min(MAX_WINDOW)
    }
}

/// Outcome of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Rejected; the caller may retry after this many seconds (at least 1).
    Denied { retry_after_secs: u64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Token bucket for a single caller.
#[derive(Debug)]
struct TokenBucket {
    capacity: u32,
    tokens: u32,
    window: Duration,
    /// Start of the current window.
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, window: Duration, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            window,
            last_refill: now,
        }
    }

    /// Restore full capacity when at least one whole window has elapsed.
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed < self.window {
            return;
        }
        let into_current = elapsed.as_nanos() % self.window.as_nanos();
        let into_current = Duration::from_nanos(u64::try_from(into_current).unwrap_or(u64::MAX));
        self.last_refill = now.checked_sub(into_current).unwrap_or(now);
        self.tokens = self.capacity;
    }

    /// Consume one token, or return the wait until the next refill.
    fn try_consume(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if self.tokens > 0 {
            self.tokens -= 1;
            Ok(())
        } else {
            let wait = match self.last_refill.checked_add(self.window) {
                Some(next_refill) => next_refill.saturating_duration_since(now),
                None => self.window,
            };
            Err(wait)
        }
    }
}

/// Per-key token bucket rate limiter.
///
/// Buckets live in a sharded map, so admission for one key never waits on
/// an unrelated key. Buckets are never evicted.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Try to consume one token for `key`.
    pub fn admit(&self, key: &str) -> Admission {
        if !self.config.enabled {
            return Admission::Allowed;
        }

        let now = Instant::now();
        let outcome = {
            let mut bucket = self
                .buckets
                .entry(key.to_owned())
                .or_insert_with(|| {
                    TokenBucket::new(self.config.capacity(), self.config.window(), now)
                });
            bucket.try_consume(now)
        };

        match outcome {
            Ok(()) => Admission::Allowed,
            Err(wait) => {
                let retry_after_secs = retry_after_secs(wait);
                warn!(
                    key = %redact_key(key),
                    retry_after_secs,
                    "Rate limit exceeded"
                );
                Admission::Denied { retry_after_secs }
            }
        }
    }

    /// Tokens left for `key` in the current window. Unknown keys report full capacity.
    pub fn remaining_tokens(&self, key: &str) -> u32 {
        match self.buckets.get_mut(key) {
            Some(mut bucket) => {
                bucket.refill(Instant::now());
                bucket.tokens
            }
            None => self.config.capacity(),
        }
    }

    /// Number of callers that currently own a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

/// Whole seconds to wait, rounded up, never below 1.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Derive the rate-limit key for a request.
///
/// A `Bearer` credential wins; otherwise the caller address is used.
pub fn rate_limit_key(authorization: Option<&str>, remote: Option<SocketAddr>) -> String {
    if let Some(token) = authorization.and_then(bearer_token) {
        debug!("Rate limiting by bearer credential");
        return token.to_owned();
    }
    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CALLER_KEY.to_owned())
}

fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.trim().splitn(2, ' ');
    let (Some(scheme), Some(token)) = (parts.next(), parts.next()) else {
        return None;
    };
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Addresses are logged as-is; credentials only by prefix.
fn redact_key(key: &str) -> String {
    if key.parse::<IpAddr>().is_ok() || key == UNKNOWN_CALLER_KEY {
        return key.to_owned();
    }
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}***")
}
