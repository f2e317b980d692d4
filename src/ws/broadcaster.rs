//! Fan-out of quote updates to every registered connection.

use std::sync::Arc;

use tokio_tungstenite::tungstenite::Message;

use crate::error::Result;
use crate::types::quote::Quote;
use crate::ws::registry::{ConnectionRegistry, SendFailure};

/// Outcome of one [`Broadcaster::broadcast`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was queued on.
    pub delivered: usize,
    /// Connections removed because the frame could not be queued.
    pub pruned: usize,
}

/// Pushes each [`Quote`] to all open connections.
///
/// The quote is serialized once and the resulting frame shared by every
/// connection. Sending never suspends; a connection that is closed or whose
/// outbound queue is full is deregistered and told to close, and the loop
/// moves on to the next one.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Serialize `quote` to its wire frame.
    pub fn encode(quote: &Quote) -> Result<Message> {
        let json = serde_json::to_string(quote)?;
        Ok(Message::Text(json.into()))
    }

    /// Deliver `quote` to every connection registered right now.
    ///
    /// Only serialization can fail; per-connection failures are absorbed
    /// into [`BroadcastReport::pruned`].
    pub fn broadcast(&self, quote: &Quote) -> Result<BroadcastReport> {
        let frame = Self::encode(quote)?;
        let mut report = BroadcastReport::default();

        self.registry.for_each(|conn| {
            let outcome = if conn.is_open() {
                conn.try_send(frame.clone())
            } else {
                Err(SendFailure::Closed)
            };

            match outcome {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    tracing::warn!(
                        connection = %conn.id(),
                        symbol = %quote.symbol,
                        ?failure,
                        "Dropping connection after failed send"
                    );
                    self.registry.deregister(conn.id());
                    conn.request_close();
                    report.pruned += 1;
                }
            }
        });

        tracing::debug!(
            symbol = %quote.symbol,
            delivered = report.delivered,
            pruned = report.pruned,
            "Broadcast quote"
        );
        Ok(report)
    }
}
