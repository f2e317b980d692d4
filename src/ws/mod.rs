//! Push-channel side of the relay.
//!
//! ## [`registry`] — Connection Registry
//!
//! Tracks every open WebSocket session. Iteration works on a snapshot, so
//! sessions may come and go while a broadcast is in flight.
//!
//! ## [`broadcaster`] — Fan-out
//!
//! Serializes a [`Quote`](crate::types::Quote) once and queues it on every
//! registered session without suspending. Sessions that cannot take the
//! frame are pruned.
//!
//! ## [`server`] — Transport Server
//!
//! Accepts WebSocket connections, registers and deregisters them, and
//! acknowledges `subscribe` / `unsubscribe` control frames.
//!
//! ## Wire format
//!
//! - Quote updates: `{ "symbol": "AAPL", "price": "189.84", "timestamp": "…" }`
//! - Client control: `{ "type": "subscribe" | "unsubscribe", "symbols": [..] }`
//! - Server control: `{ "type": "subscription_confirmed" | "unsubscription_confirmed", "symbols": [..] }`,
//!   `{ "type": "error", "message": "…" }`

pub mod broadcaster;
pub mod registry;
pub mod server;
