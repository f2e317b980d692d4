//! # quote-relay
//!
//! A real-time market-data relay. A rate-limited scheduler polls the
//! [Alpha Vantage](https://www.alphavantage.co/documentation/#latestprice)
//! `GLOBAL_QUOTE` endpoint one symbol at a time and fans every quote out to
//! all connected WebSocket viewers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use quote_relay::config::RelayConfig;
//! use quote_relay::relay::Relay;
//!
//! #[tokio::main]
//! async fn main() -> quote_relay::error::Result<()> {
//!     let config = RelayConfig::from_env()?;
//!     Relay::start(config).await?.run_until_shutdown().await
//! }
//! ```
//!
//! ## Delivery
//!
//! Delivery is at-most-once: a viewer receives the quotes broadcast while it
//! is connected and nothing else. There is no history and no replay.

pub mod api;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod relay;
pub mod scheduler;
pub mod types;
pub mod ws;

/// Re-export the main client type at crate root for convenience.
pub use client::QuoteClient;
/// Re-export the error type and Result alias.
pub use error::{RelayError, Result};
