//! Error types for the `quote-relay` crate.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, RelayError>`.
//!
//! [`RelayError`] covers:
//! - **Upstream errors** — Alpha Vantage error bodies, rate-limit notes,
//!   unexpected status codes, and quote payloads without a usable price
//! - **HTTP transport errors** — Network, TLS, timeout failures
//! - **JSON errors** — Serialization and deserialization failures
//! - **WebSocket errors** — Handshake and protocol errors on the push channel
//! - **Configuration errors** — Missing API key, empty symbol set, bad values
//!
//! Upstream and connection errors are recovered locally by the scheduler and
//! the broadcaster. Only [`RelayError::Config`] is meant to stop the process,
//! and only at startup.

/// All possible errors produced by the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Alpha Vantage answered with an `"Error Message"` body (unknown
    /// function, invalid symbol, bad key).
    #[error("API error: {0}")]
    Api(String),

    /// Alpha Vantage rejected the call because the request ceiling was hit.
    /// The provider reports this with HTTP 200 and a `"Note"` or
    /// `"Information"` body.
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    /// The server returned an unexpected HTTP status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code.
        status: reqwest::StatusCode,
        /// The response body text.
        body: String,
    },

    /// A network or transport-level error from `reqwest`.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to serialize or deserialize JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response carried no quote object (or an empty one) for the symbol.
    #[error("no quote returned for {0}")]
    MissingQuote(String),

    /// The quote object had no price, or the price was not a decimal.
    #[error("invalid price for {symbol}: {reason}")]
    InvalidPrice {
        /// The symbol that was requested.
        symbol: String,
        /// What was wrong with the price field.
        reason: String,
    },

    /// A WebSocket-level error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Binding or accepting on the listen socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The relay configuration is unusable. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller provided an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl RelayError {
    /// Whether this error came from the upstream quote provider (as opposed
    /// to local transport or configuration problems).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Api(_)
                | Self::RateLimited(_)
                | Self::HttpStatus { .. }
                | Self::Http(_)
                | Self::MissingQuote(_)
                | Self::InvalidPrice { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RelayError>;
