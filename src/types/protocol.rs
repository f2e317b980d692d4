//! Push-channel control messages.
//!
//! Quote updates go out as a bare [`Quote`](crate::types::quote::Quote)
//! object. Everything else on the channel is tagged with a `type` field.

use serde::{Deserialize, Serialize};

/// Message sent from a viewer to the relay.
///
/// The relay logs and acknowledges these but broadcasts every quote to every
/// connection regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// `{ "type": "subscribe", "symbols": ["AAPL"] }`. `"all"` is accepted.
    Subscribe {
        #[serde(default)]
        symbols: Vec<String>,
    },
    /// `{ "type": "unsubscribe", "symbols": ["AAPL"] }`.
    Unsubscribe {
        #[serde(default)]
        symbols: Vec<String>,
    },
}

/// Control message sent from the relay to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a [`ClientMessage::Subscribe`].
    SubscriptionConfirmed { symbols: Vec<String> },
    /// Acknowledges a [`ClientMessage::Unsubscribe`].
    UnsubscriptionConfirmed { symbols: Vec<String> },
    /// The inbound frame could not be understood. The connection stays open.
    Error { message: String },
}
