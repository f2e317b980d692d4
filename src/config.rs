//! Relay configuration.
//!
//! Everything the core needs is supplied from outside: the upstream API key,
//! the listen address, the symbol set, and the scheduler delays. Values come
//! from the environment ([`RelayConfig::from_env`]) or from a
//! [`RelayConfigBuilder`]; either way [`RelayConfig::validate`] must pass
//! before polling starts.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `ALPHA_VANTAGE_API_KEY` | upstream API key | required |
//! | `ALPHA_VANTAGE_BASE_URL` | upstream base URL | `https://www.alphavantage.co` |
//! | `RELAY_HOST` | listen host | `0.0.0.0` |
//! | `RELAY_PORT` | listen port | `8080` |
//! | `RELAY_SYMBOLS` | comma-separated tickers | `AAPL,GOOGL,MSFT,AMZN,TSLA` |
//! | `RELAY_REQUESTS_PER_MINUTE` | upstream ceiling, derives the delay | `5` |
//! | `RELAY_INTER_SYMBOL_DELAY_MS` | explicit delay, overrides the derived one | — |
//! | `RELAY_CYCLE_INTERVAL_SECS` | time between cycle starts | `3600` |
//! | `RELAY_INITIAL_DELAY_SECS` | wait before the first cycle | `60` |
//! | `RELAY_REQUEST_TIMEOUT_SECS` | upstream HTTP timeout | `10` |

use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    API_BASE_URL, DEFAULT_CYCLE_INTERVAL, DEFAULT_HOST, DEFAULT_INITIAL_DELAY, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SYMBOLS, rate_limits,
};
use crate::error::{RelayError, Result};
use crate::scheduler::PollTiming;
use crate::types::SymbolSet;

pub const ENV_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const ENV_BASE_URL: &str = "ALPHA_VANTAGE_BASE_URL";
pub const ENV_HOST: &str = "RELAY_HOST";
pub const ENV_PORT: &str = "RELAY_PORT";
pub const ENV_SYMBOLS: &str = "RELAY_SYMBOLS";
pub const ENV_REQUESTS_PER_MINUTE: &str = "RELAY_REQUESTS_PER_MINUTE";
pub const ENV_INTER_SYMBOL_DELAY_MS: &str = "RELAY_INTER_SYMBOL_DELAY_MS";
pub const ENV_CYCLE_INTERVAL_SECS: &str = "RELAY_CYCLE_INTERVAL_SECS";
pub const ENV_INITIAL_DELAY_SECS: &str = "RELAY_INITIAL_DELAY_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "RELAY_REQUEST_TIMEOUT_SECS";

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Alpha Vantage API key.
    pub api_key: String,
    /// Upstream base URL (defaults to [`API_BASE_URL`]).
    pub base_url: String,
    /// Host the push channel binds to.
    pub host: String,
    /// Port the push channel binds to.
    pub port: u16,
    /// Tickers to poll, in polling order.
    pub symbols: SymbolSet,
    /// Scheduler delays.
    pub timing: PollTiming,
    /// Upper bound on one upstream call.
    pub request_timeout: Duration,
}

impl RelayConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(ENV_API_KEY)
            .ok_or_else(|| RelayError::Config(format!("{ENV_API_KEY} is not set")))?;

        let mut builder = RelayConfigBuilder::new(api_key);

        if let Some(url) = get(ENV_BASE_URL) {
            builder = builder.base_url(url);
        }
        if let Some(host) = get(ENV_HOST) {
            builder = builder.host(host);
        }
        if let Some(port) = parse_var(&get, ENV_PORT)? {
            builder = builder.port(port);
        }
        if let Some(list) = get(ENV_SYMBOLS) {
            builder = builder.symbols(SymbolSet::parse(&list)?);
        }
        if let Some(rpm) = parse_var(&get, ENV_REQUESTS_PER_MINUTE)? {
            builder = builder.requests_per_minute(rpm)?;
        }
        if let Some(ms) = parse_var(&get, ENV_INTER_SYMBOL_DELAY_MS)? {
            builder = builder.inter_symbol_delay(Duration::from_millis(ms));
        }
        if let Some(secs) = parse_var(&get, ENV_CYCLE_INTERVAL_SECS)? {
            builder = builder.cycle_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var(&get, ENV_INITIAL_DELAY_SECS)? {
            builder = builder.initial_delay(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var(&get, ENV_REQUEST_TIMEOUT_SECS)? {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// `host:port` string for the listen socket.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject configurations the relay cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RelayError::Config("API key is empty".into()));
        }
        if self.symbols.is_empty() {
            return Err(RelayError::Config("symbol set is empty".into()));
        }
        if self.timing.cycle_interval.is_zero() {
            return Err(RelayError::Config("cycle interval must be non-zero".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(RelayError::Config("request timeout must be non-zero".into()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| RelayError::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        Ok(())
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| RelayError::Config(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`RelayConfig`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use quote_relay::config::RelayConfigBuilder;
///
/// let config = RelayConfigBuilder::new("demo")
///     .port(9000)
///     .requests_per_minute(5)?
///     .cycle_interval(Duration::from_secs(600))
///     .build()?;
/// assert_eq!(config.timing.inter_symbol_delay, Duration::from_secs(12));
/// # Ok::<(), quote_relay::error::RelayError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfigBuilder {
    api_key: String,
    base_url: String,
    host: String,
    port: u16,
    symbols: Option<SymbolSet>,
    timing: PollTiming,
    request_timeout: Duration,
}

impl RelayConfigBuilder {
    /// Start from the defaults with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_owned(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            symbols: None,
            timing: PollTiming {
                inter_symbol_delay: Duration::from_secs(60)
                    / rate_limits::FREE_TIER_PER_MINUTE,
                cycle_interval: DEFAULT_CYCLE_INTERVAL,
                initial_delay: DEFAULT_INITIAL_DELAY,
            },
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Upstream base URL. Default: `https://www.alphavantage.co`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Listen host. Default: `0.0.0.0`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Listen port. Default: 8080.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Symbols to poll. Default: `AAPL, GOOGL, MSFT, AMZN, TSLA`.
    pub fn symbols(mut self, symbols: SymbolSet) -> Self {
        self.symbols = Some(symbols);
        self
    }

    /// Derive the inter-symbol delay from an upstream ceiling. Default: 5/min.
    pub fn requests_per_minute(mut self, rpm: u32) -> Result<Self> {
        self.timing.inter_symbol_delay = PollTiming::delay_for_rate(rpm)?;
        Ok(self)
    }

    /// Set the inter-symbol delay directly. Default: 12 s.
    pub fn inter_symbol_delay(mut self, delay: Duration) -> Self {
        self.timing.inter_symbol_delay = delay;
        self
    }

    /// Time between cycle starts. Default: 1 h.
    pub fn cycle_interval(mut self, interval: Duration) -> Self {
        self.timing.cycle_interval = interval;
        self
    }

    /// Wait before the first cycle. Default: 60 s.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.timing.initial_delay = delay;
        self
    }

    /// Upstream HTTP timeout. Default: 10 s.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<RelayConfig> {
        let symbols = match self.symbols {
            Some(symbols) => symbols,
            None => SymbolSet::new(DEFAULT_SYMBOLS)?,
        };
        let config = RelayConfig {
            api_key: self.api_key,
            base_url: self.base_url,
            host: self.host,
            port: self.port,
            symbols,
            timing: self.timing,
            request_timeout: self.request_timeout,
        };
        config.validate()?;
        Ok(config)
    }
}
