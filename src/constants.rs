//! Constants for the relay.
//!
//! Contains the upstream base URL, rate limit values, and the defaults used
//! by [`RelayConfig`](crate::config::RelayConfig) when the environment does
//! not override them.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

/// Base URL for the Alpha Vantage REST API.
pub const API_BASE_URL: &str = "https://www.alphavantage.co";

/// Path of the single query endpoint every Alpha Vantage function shares.
pub const QUERY_PATH: &str = "/query";

/// `function` parameter value for the latest-price endpoint.
pub const GLOBAL_QUOTE_FUNCTION: &str = "GLOBAL_QUOTE";

// ---------------------------------------------------------------------------
// Rate Limits
// ---------------------------------------------------------------------------

/// Rate limit configuration for the upstream provider.
pub mod rate_limits {
    /// Free-tier request ceiling per minute.
    pub const FREE_TIER_PER_MINUTE: u32 = 5;
    /// Free-tier request ceiling per day.
    pub const FREE_TIER_PER_DAY: u32 = 25;
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Symbols polled when `RELAY_SYMBOLS` is not set.
pub const DEFAULT_SYMBOLS: [&str; 5] = ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"];

/// Default listen host for the push channel.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port for the push channel.
pub const DEFAULT_PORT: u16 = 8080;

/// Default time between two cycle starts.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default wait before the first cycle so the process can finish starting.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(60);

/// Default upper bound on a single upstream call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket constraints for the push channel.
pub mod websocket {
    use std::time::Duration;

    /// Interval between server-initiated pings.
    pub const PING_INTERVAL: Duration = Duration::from_secs(30);
    /// Outbound frames buffered per connection before it counts as stalled.
    pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;
}
