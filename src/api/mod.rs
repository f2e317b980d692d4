//! REST API endpoint implementations.
//!
//! Each sub-module adds high-level `async` methods to
//! [`QuoteClient`](crate::client::QuoteClient) via `impl` blocks.
//!
//! | Module | Function | Description |
//! |---|---|---|
//! | [`global_quote`] | `GLOBAL_QUOTE` | Latest price and day statistics for one symbol |

pub mod global_quote;
