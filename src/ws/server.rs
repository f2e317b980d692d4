//! WebSocket transport server for the push channel.
//!
//! Accepts TCP connections, performs the WebSocket handshake, and registers
//! each session in the [`ConnectionRegistry`]. Every session runs as two
//! Tokio tasks:
//!
//! ```text
//!   socket ──read──▶ reader loop ──control replies──┐
//!                      │  ▲                         ▼
//!                      │  └── close request    outbound queue ◀── Broadcaster
//!                      ▼                            │
//!                  deregister                  writer task ──write──▶ socket
//! ```
//!
//! The reader loop handles inbound control frames, sends keepalive pings,
//! and deregisters the connection when the peer goes away or the
//! broadcaster prunes it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::constants::websocket::{OUTBOUND_QUEUE_CAPACITY, PING_INTERVAL};
use crate::error::{RelayError, Result};
use crate::types::protocol::{ClientMessage, ServerMessage};
use crate::ws::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};

/// Per-session settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Interval between server-initiated pings.
    pub ping_interval: Duration,
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: PING_INTERVAL,
            outbound_capacity: OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

/// Listening push-channel server.
pub struct RelayServer {
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
    session: SessionConfig,
}

impl RelayServer {
    /// Bind the listen socket. Connections are not accepted until
    /// [`run`](Self::run) is called.
    pub async fn bind(addr: impl ToSocketAddrs, registry: Arc<ConnectionRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            registry,
            session: SessionConfig::default(),
        })
    }

    /// Override the per-session settings.
    ///
    /// Returns [`RelayError::Config`] if the ping interval or the outbound
    /// queue capacity is zero.
    pub fn with_session_config(mut self, session: SessionConfig) -> Result<Self> {
        if session.ping_interval.is_zero() {
            return Err(RelayError::Config("ping interval must be non-zero".into()));
        }
        if session.outbound_capacity == 0 {
            return Err(RelayError::Config(
                "outbound queue capacity must be non-zero".into(),
            ));
        }
        self.session = session;
        Ok(self)
    }

    /// The address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped or aborted.
    ///
    /// A failed `accept` or handshake only affects that one connection.
    /// Sessions are owned by the accept loop: dropping or aborting it closes
    /// every connection it accepted.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "Push channel listening on ws://{addr}");
        }

        let mut sessions = JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let registry = self.registry.clone();
                        sessions.spawn(handle_connection(stream, peer, registry, self.session));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                    }
                },
                Some(res) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = res {
                        tracing::error!(error = %e, "Session task failed");
                    }
                }
            }
        }
    }

    /// Run the accept loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Drive one WebSocket session from handshake to deregistration.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    session: SessionConfig,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(%peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    let (tx, mut rx) = mpsc::channel::<Message>(session.outbound_capacity);
    let conn = ConnectionHandle::new(tx, Some(peer));
    let id = conn.id();
    registry.register(conn.clone());

    tracing::info!(connection = %id, %peer, clients = registry.len(), "Client connected");

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write.send(msg).await {
                tracing::debug!(connection = %id, error = %e, "Write failed");
                break;
            }
        }
    });
    let session_guard = SessionGuard {
        registry: registry.clone(),
        id,
        writer,
    };

    let mut ping = tokio::time::interval(session.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            _ = conn.close_requested() => {
                tracing::info!(connection = %id, "Closing connection on request");
                break;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_control(&conn, text.as_bytes()),
                Some(Ok(Message::Binary(data))) => handle_control(&conn, &data),
                Some(Ok(Message::Close(_))) | None => break,
                // Pings are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(connection = %id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = ping.tick() => {
                if conn.try_send(Message::Ping(Default::default())).is_err() {
                    tracing::debug!(connection = %id, "Keepalive ping could not be queued");
                    break;
                }
            }
        }
    }

    drop(session_guard);
    drop(conn);

    tracing::info!(connection = %id, clients = registry.len(), "Client disconnected");
}

/// Deregisters the session and stops its writer when the session ends,
/// including when the session task itself is aborted.
struct SessionGuard {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
    writer: JoinHandle<()>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
        self.writer.abort();
    }
}

/// Log and acknowledge an inbound control frame.
///
/// Subscriptions do not change what the connection receives: every quote
/// goes to every connection.
fn handle_control(conn: &ConnectionHandle, raw: &[u8]) {
    let reply = match serde_json::from_slice::<ClientMessage>(raw) {
        Ok(ClientMessage::Subscribe { symbols }) => {
            tracing::info!(connection = %conn.id(), ?symbols, "Subscribe");
            ServerMessage::SubscriptionConfirmed { symbols }
        }
        Ok(ClientMessage::Unsubscribe { symbols }) => {
            tracing::info!(connection = %conn.id(), ?symbols, "Unsubscribe");
            ServerMessage::UnsubscriptionConfirmed { symbols }
        }
        Err(e) => {
            tracing::debug!(connection = %conn.id(), error = %e, "Unrecognized control frame");
            ServerMessage::Error {
                message: format!("unrecognized control message: {e}"),
            }
        }
    };

    match serde_json::to_string(&reply) {
        Ok(json) => {
            if let Err(failure) = conn.try_send(Message::Text(json.into())) {
                tracing::debug!(connection = %conn.id(), ?failure, "Control reply dropped");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to encode control reply"),
    }
}
