//! Quote types — the normalized [`Quote`] pushed to viewers and the raw
//! Alpha Vantage `GLOBAL_QUOTE` payload it is built from.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

// ---------------------------------------------------------------------------
// Normalized quote
// ---------------------------------------------------------------------------

/// A single symbol/price/timestamp observation.
///
/// Produced once per successful upstream fetch and never mutated afterwards.
/// Serializes to the push-channel wire shape:
///
/// ```json
/// { "symbol": "AAPL", "price": "189.84", "timestamp": "2026-10-18T14:30:12.512Z" }
/// ```
///
/// The optional detail fields are only present on the wire when the upstream
/// payload carried them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker the quote was requested for.
    pub symbol: String,
    /// Latest traded price.
    pub price: Decimal,
    /// Local time at which the fetch completed.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
    /// Day change in percent, without the trailing `%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

impl Quote {
    /// Create a quote carrying only the required fields.
    pub fn new(symbol: impl Into<String>, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
            open: None,
            high: None,
            low: None,
            previous_close: None,
            change: None,
            change_percent: None,
            volume: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Upstream payload
// ---------------------------------------------------------------------------

/// Response body of `GET /query?function=GLOBAL_QUOTE`.
///
/// Alpha Vantage answers every call with HTTP 200; failures are only visible
/// in the body, through one of the message fields below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalQuoteResponse {
    /// The quote object. Empty (`{}`) for unknown symbols.
    #[serde(rename = "Global Quote", default)]
    pub global_quote: Option<GlobalQuote>,
    /// Rate-limit notice used by older API revisions.
    #[serde(rename = "Note", default)]
    pub note: Option<String>,
    /// Rate-limit / premium notice used by newer API revisions.
    #[serde(rename = "Information", default)]
    pub information: Option<String>,
    /// Invalid call (bad function, bad key, malformed symbol).
    #[serde(rename = "Error Message", default)]
    pub error_message: Option<String>,
}

/// The `"Global Quote"` object. Every value arrives as a string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalQuote {
    #[serde(rename = "01. symbol", default)]
    pub symbol: Option<String>,
    #[serde(rename = "02. open", default)]
    pub open: Option<String>,
    #[serde(rename = "03. high", default)]
    pub high: Option<String>,
    #[serde(rename = "04. low", default)]
    pub low: Option<String>,
    #[serde(rename = "05. price", default)]
    pub price: Option<String>,
    #[serde(rename = "06. volume", default)]
    pub volume: Option<String>,
    #[serde(rename = "07. latest trading day", default)]
    pub latest_trading_day: Option<String>,
    #[serde(rename = "08. previous close", default)]
    pub previous_close: Option<String>,
    #[serde(rename = "09. change", default)]
    pub change: Option<String>,
    #[serde(rename = "10. change percent", default)]
    pub change_percent: Option<String>,
}

impl GlobalQuote {
    fn is_empty(&self) -> bool {
        self.symbol.is_none() && self.price.is_none()
    }
}

impl GlobalQuoteResponse {
    /// Normalize the payload into a [`Quote`] for `symbol`, stamped with
    /// `fetched_at`.
    ///
    /// The upstream `latest trading day` is a date only and is not used.
    pub fn into_quote(self, symbol: &str, fetched_at: DateTime<Utc>) -> Result<Quote> {
        if let Some(msg) = self.error_message {
            return Err(RelayError::Api(msg));
        }
        if let Some(msg) = self.note.or(self.information) {
            return Err(RelayError::RateLimited(msg));
        }

        let raw = self
            .global_quote
            .filter(|q| !q.is_empty())
            .ok_or_else(|| RelayError::MissingQuote(symbol.to_owned()))?;

        let price_str = raw.price.as_deref().ok_or_else(|| RelayError::InvalidPrice {
            symbol: symbol.to_owned(),
            reason: "price field missing".into(),
        })?;
        let price = parse_decimal(price_str).map_err(|e| RelayError::InvalidPrice {
            symbol: symbol.to_owned(),
            reason: format!("{price_str:?}: {e}"),
        })?;
        if price <= Decimal::ZERO {
            return Err(RelayError::InvalidPrice {
                symbol: symbol.to_owned(),
                reason: format!("non-positive price {price}"),
            });
        }

        Ok(Quote {
            symbol: symbol.to_owned(),
            price,
            timestamp: fetched_at,
            open: optional_decimal(raw.open.as_deref()),
            high: optional_decimal(raw.high.as_deref()),
            low: optional_decimal(raw.low.as_deref()),
            previous_close: optional_decimal(raw.previous_close.as_deref()),
            change: optional_decimal(raw.change.as_deref()),
            change_percent: optional_decimal(
                raw.change_percent.as_deref().map(|s| s.trim().trim_end_matches('%')),
            ),
            volume: raw.volume.as_deref().and_then(|v| v.trim().parse().ok()),
        })
    }
}

fn parse_decimal(s: &str) -> std::result::Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(s.trim())
}

fn optional_decimal(s: Option<&str>) -> Option<Decimal> {
    s.and_then(|v| parse_decimal(v).ok())
}
