//! Relay binary: polls Alpha Vantage and serves quotes over WebSocket.
//!
//! # Usage
//!
//! ```sh
//! export ALPHA_VANTAGE_API_KEY="your-api-key"
//! export RELAY_SYMBOLS="AAPL,GOOGL,MSFT"
//! cargo run --features cli --bin quote_relay
//! ```
//!
//! See [`quote_relay::config`] for every supported variable. Log verbosity is
//! controlled with `RUST_LOG` (default `info`).

use quote_relay::config::RelayConfig;
use quote_relay::relay::Relay;

#[tokio::main]
async fn main() -> quote_relay::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Refusing to start");
    })?;

    let relay = Relay::start(config).await?;
    relay.run_until_shutdown().await
}
