use std::{fmt::Display, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{bail, Context};
use purchasefx_exchange_rates::{
    config::{DEFAULT_LOOKBACK_MONTHS, DEFAULT_TIMEOUT_MS, DEFAULT_TREASURY_BASE_URL},
    ExchangeRateConfig, RateLimitConfig, RetryPolicy, TreasuryConfig,
};
use reqwest::Url;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Headroom on top of the upstream budget for routing, serialization and the
/// cache round trip.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub exchange_rates: ExchangeRateConfig,
}

impl Default for Config {
    fn default() -> Self {
        let exchange_rates = ExchangeRateConfig::default();
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: default_request_timeout(&exchange_rates),
            exchange_rates,
        }
    }
}

/// Request timeout that lets a lookup exhaust its retries against a hung
/// upstream and still answer with its own error.
pub fn default_request_timeout(exchange_rates: &ExchangeRateConfig) -> Duration {
    exchange_rates
        .upstream_budget()
        .saturating_add(REQUEST_TIMEOUT_MARGIN)
}

impl Config {
    /// Load from the process environment, reading `.env` first when present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// Malformed numeric or boolean values fall back to their defaults with a
    /// warning. A malformed listen address or base URL is an error, and so is
    /// a request timeout shorter than the upstream retry budget.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr: SocketAddr = lookup("PFX_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .context("Invalid PFX_LISTEN_ADDR")?;

        let base_url = lookup("PFX_TREASURY_BASE_URL")
            .unwrap_or_else(|| DEFAULT_TREASURY_BASE_URL.to_string());
        let parsed = Url::parse(&base_url).context("Invalid PFX_TREASURY_BASE_URL")?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("Invalid PFX_TREASURY_BASE_URL: unsupported scheme '{}'", parsed.scheme());
        }

        let cors_allow = lookup("PFX_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let treasury = TreasuryConfig {
            base_url,
            lookback_months: parse_or(&lookup, "PFX_TREASURY_LOOKBACK_MONTHS", DEFAULT_LOOKBACK_MONTHS),
            timeout_ms: parse_or(&lookup, "PFX_TREASURY_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy::fixed(
            parse_or(&lookup, "PFX_RETRY_MAX_ATTEMPTS", retry_defaults.max_attempts),
            Duration::from_millis(parse_or(&lookup, "PFX_RETRY_DELAY_MS", retry_defaults.delay_ms)),
        );

        let limit_defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            enabled: parse_or(&lookup, "PFX_RATE_LIMIT_ENABLED", limit_defaults.enabled),
            requests: parse_or(&lookup, "PFX_RATE_LIMIT_REQUESTS", limit_defaults.requests),
            duration_seconds: parse_or(
                &lookup,
                "PFX_RATE_LIMIT_DURATION_SECONDS",
                limit_defaults.duration_seconds,
            ),
        };

        let exchange_rates = ExchangeRateConfig {
            treasury,
            retry,
            rate_limit,
        };

        let derived_timeout = default_request_timeout(&exchange_rates);
        let request_timeout = Duration::from_millis(parse_or(
            &lookup,
            "PFX_REQUEST_TIMEOUT_MS",
            u64::try_from(derived_timeout.as_millis()).unwrap_or(u64::MAX),
        ));
        let budget = exchange_rates.upstream_budget();
        if request_timeout < budget {
            bail!(
                "PFX_REQUEST_TIMEOUT_MS ({} ms) is shorter than the upstream retry budget ({} ms)",
                request_timeout.as_millis(),
                budget.as_millis()
            );
        }

        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout,
            exchange_rates,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, value = %raw, default = %default, error = %e, "Invalid configuration value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.cors_allow, vec!["*".to_string()]);
        // 3 attempts of 30 s, 2 delays of 500 ms, 5 s of headroom.
        assert_eq!(config.request_timeout, Duration::from_secs(96));
        assert_eq!(config.exchange_rates, ExchangeRateConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("PFX_LISTEN_ADDR", "127.0.0.1:9000"),
            ("PFX_TREASURY_LOOKBACK_MONTHS", "3"),
            ("PFX_RETRY_MAX_ATTEMPTS", "5"),
            ("PFX_RETRY_DELAY_MS", "100"),
            ("PFX_RATE_LIMIT_ENABLED", "false"),
            ("PFX_RATE_LIMIT_REQUESTS", "5"),
            ("PFX_CORS_ALLOW_ORIGINS", "https://a.example, https://b.example"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.exchange_rates.treasury.lookback_months, 3);
        assert_eq!(config.exchange_rates.retry.attempts(), 5);
        assert_eq!(
            config.exchange_rates.retry.delay_for(1),
            Duration::from_millis(100)
        );
        assert!(!config.exchange_rates.rate_limit.enabled);
        assert_eq!(config.exchange_rates.rate_limit.requests, 5);
        assert_eq!(config.cors_allow.len(), 2);
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let config = config_from(&[
            ("PFX_RATE_LIMIT_REQUESTS", "lots"),
            ("PFX_RATE_LIMIT_ENABLED", "maybe"),
        ])
        .unwrap();
        assert_eq!(config.exchange_rates.rate_limit.requests, 60);
        assert!(config.exchange_rates.rate_limit.enabled);
    }

    #[test]
    fn request_timeout_follows_the_retry_budget() {
        let config = config_from(&[
            ("PFX_TREASURY_TIMEOUT_MS", "2000"),
            ("PFX_RETRY_MAX_ATTEMPTS", "2"),
            ("PFX_RETRY_DELAY_MS", "1000"),
        ])
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(10));

        let explicit = config_from(&[("PFX_REQUEST_TIMEOUT_MS", "120000")]).unwrap();
        assert_eq!(explicit.request_timeout, Duration::from_secs(120));

        let fallback = config_from(&[("PFX_REQUEST_TIMEOUT_MS", "soon")]).unwrap();
        assert_eq!(fallback.request_timeout, Duration::from_secs(96));
    }

    #[test]
    fn request_timeout_below_the_retry_budget_is_an_error() {
        let err = config_from(&[("PFX_REQUEST_TIMEOUT_MS", "30000")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("retry budget"));
    }

    #[test]
    fn malformed_listen_addr_or_url_is_an_error() {
        assert!(config_from(&[("PFX_LISTEN_ADDR", "nowhere")]).is_err());
        assert!(config_from(&[("PFX_TREASURY_BASE_URL", "not a url")]).is_err());
        assert!(config_from(&[("PFX_TREASURY_BASE_URL", "ftp://host/rates")]).is_err());
    }
}
