//! The quote-fetching seam between the scheduler and the upstream provider.

use std::future::Future;
use std::sync::Arc;

use crate::client::QuoteClient;
use crate::error::Result;
use crate::types::quote::Quote;

/// Fetches the current quote for one symbol.
///
/// Implementations perform at most one upstream call per invocation and
/// never retry; the next scheduled cycle is the retry. Any `Err` is treated
/// by the scheduler as "no quote for this symbol this cycle".
pub trait QuoteFetcher: Send + Sync {
    /// Fetch one quote. `symbol` is non-empty and belongs to the polled
    /// [`SymbolSet`](crate::types::SymbolSet).
    fn fetch(&self, symbol: &str) -> impl Future<Output = Result<Quote>> + Send;
}

impl QuoteFetcher for QuoteClient {
    async fn fetch(&self, symbol: &str) -> Result<Quote> {
        self.get_global_quote(symbol).await
    }
}

impl<F: QuoteFetcher> QuoteFetcher for Arc<F> {
    fn fetch(&self, symbol: &str) -> impl Future<Output = Result<Quote>> + Send {
        (**self).fetch(symbol)
    }
}
