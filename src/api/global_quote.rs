//! Global Quote endpoint — latest price for a single symbol.

use chrono::Utc;

use crate::client::QuoteClient;
use crate::constants::GLOBAL_QUOTE_FUNCTION;
use crate::error::{RelayError, Result};
use crate::types::quote::{GlobalQuoteResponse, Quote};

impl QuoteClient {
    /// Retrieve the raw `GLOBAL_QUOTE` payload for `symbol`.
    ///
    /// **Endpoint:** `GET /query?function=GLOBAL_QUOTE&symbol=<symbol>`
    pub async fn get_global_quote_raw(&self, symbol: &str) -> Result<GlobalQuoteResponse> {
        if symbol.trim().is_empty() {
            return Err(RelayError::InvalidArgument("symbol is empty".into()));
        }
        self.query(GLOBAL_QUOTE_FUNCTION, &[("symbol", symbol)]).await
    }

    /// Retrieve and normalize the latest quote for `symbol`.
    ///
    /// One HTTP call, no retries. The quote is stamped with the local time
    /// at which the response body was read.
    pub async fn get_global_quote(&self, symbol: &str) -> Result<Quote> {
        let raw = self.get_global_quote_raw(symbol).await?;
        raw.into_quote(symbol, Utc::now())
    }
}
