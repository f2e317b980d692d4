//! Process-level wiring: build every component from a [`RelayConfig`] and
//! run until shutdown.
//!
//! ```text
//!   PollScheduler ──fetch──▶ QuoteClient ──HTTP──▶ Alpha Vantage
//!        │
//!        └──quote──▶ Broadcaster ──▶ ConnectionRegistry ◀── RelayServer ◀── viewers
//! ```
//!
//! The scheduler and the accept loop run as independent Tokio tasks and
//! share only the registry.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::client::QuoteClient;
use crate::config::RelayConfig;
use crate::error::Result;
use crate::scheduler::PollScheduler;
use crate::ws::broadcaster::Broadcaster;
use crate::ws::registry::ConnectionRegistry;
use crate::ws::server::RelayServer;

/// A started relay. Dropping it aborts both background tasks.
pub struct Relay {
    registry: Arc<ConnectionRegistry>,
    local_addr: SocketAddr,
    server: JoinHandle<()>,
    scheduler: JoinHandle<()>,
}

impl Relay {
    /// Validate `config`, bind the push channel, and start polling.
    ///
    /// Configuration errors are returned before anything is spawned.
    pub async fn start(config: RelayConfig) -> Result<Self> {
        config.validate()?;

        let client =
            QuoteClient::with_base_url(&config.api_key, &config.base_url, config.request_timeout)?;
        let registry = Arc::new(ConnectionRegistry::new());

        let server = RelayServer::bind(config.listen_addr(), registry.clone()).await?;
        let local_addr = server.local_addr()?;

        let scheduler = PollScheduler::new(
            client,
            Broadcaster::new(registry.clone()),
            config.symbols.clone(),
            config.timing,
        )?;

        let server = server.spawn();
        let scheduler = scheduler.spawn();

        tracing::info!(%local_addr, symbols = %config.symbols, "Relay started");

        Ok(Self {
            registry,
            local_addr,
            server,
            scheduler,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Run until Ctrl-C, or until either background task exits.
    pub async fn run_until_shutdown(mut self) -> Result<()> {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown requested");
            }
            res = &mut self.server => {
                tracing::error!(?res, "Push channel server exited");
            }
            res = &mut self.scheduler => {
                tracing::error!(?res, "Poll scheduler exited");
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Abort both background tasks.
    ///
    /// Aborting the accept loop ends every open session: each connection is
    /// deregistered and its socket closed once the runtime drops the task.
    pub fn shutdown(&self) {
        self.scheduler.abort();
        self.server.abort();
        tracing::info!(clients = self.registry.len(), "Relay shut down");
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.scheduler.abort();
        self.server.abort();
    }
}
