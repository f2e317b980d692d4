//! The ordered, duplicate-free set of tickers polled by the scheduler.

use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;

use crate::error::{RelayError, Result};

/// Ordered sequence of ticker strings, fixed at process start.
///
/// Iteration order is the polling order. Tickers are trimmed and
/// upper-cased; later duplicates are dropped. A `SymbolSet` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSet(Vec<String>);

impl SymbolSet {
    /// Build a symbol set from any list of tickers.
    ///
    /// Returns [`RelayError::Config`] if a ticker is blank or no ticker
    /// remains.
    pub fn new<I, S>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for raw in symbols {
            let symbol = raw.as_ref().trim().to_ascii_uppercase();
            if symbol.is_empty() {
                return Err(RelayError::Config("blank ticker in symbol set".into()));
            }
            if seen.insert(symbol.clone()) {
                out.push(symbol);
            } else {
                tracing::warn!(%symbol, "Duplicate ticker dropped from symbol set");
            }
        }

        if out.is_empty() {
            return Err(RelayError::Config("symbol set is empty".into()));
        }
        Ok(Self(out))
    }

    /// Parse a comma-separated list such as `"AAPL, googl,MSFT"`.
    ///
    /// Empty segments (`"AAPL,,MSFT"`, trailing commas) are skipped.
    pub fn parse(list: &str) -> Result<Self> {
        Self::new(list.split(',').filter(|s| !s.trim().is_empty()))
    }

    /// Whether `symbol` is part of the set (exact, already-normalized match).
    pub fn contains(&self, symbol: &str) -> bool {
        self.0.iter().any(|s| s == symbol)
    }

    /// The tickers in polling order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Deref for SymbolSet {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}
