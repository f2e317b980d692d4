//! Registry of live push-channel connections.
//!
//! The registry is shared between the transport server (which registers and
//! deregisters connections as sockets open and close) and the broadcaster
//! (which enumerates them on every quote). Enumeration works on a snapshot
//! taken under a short read lock, so a connection that closes mid-broadcast
//! never invalidates the iteration.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::tungstenite::Message;

// ---------------------------------------------------------------------------
// Connection ID
// ---------------------------------------------------------------------------

/// Process-unique identifier of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Allocate the next identifier.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Connection({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Connection handle
// ---------------------------------------------------------------------------

/// Why a frame could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The connection's writer is gone (socket closed or write failed).
    Closed,
    /// The outbound queue is full; the peer is not keeping up.
    Backpressured,
}

/// Cheap, cloneable handle to one live WebSocket session.
///
/// Frames are pushed onto a bounded queue drained by the connection's writer
/// task. The handle never suspends: a full or closed queue is reported as a
/// [`SendFailure`] immediately.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    tx: mpsc::Sender<Message>,
    close: Arc<Notify>,
}

impl ConnectionHandle {
    /// Wrap the sending half of a connection's outbound queue.
    pub fn new(tx: mpsc::Sender<Message>, peer: Option<SocketAddr>) -> Self {
        Self {
            id: ConnectionId::next(),
            peer,
            tx,
            close: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Whether the writer side is still accepting frames.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame without waiting.
    pub fn try_send(&self, msg: Message) -> std::result::Result<(), SendFailure> {
        self.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendFailure::Backpressured,
            mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
        })
    }

    /// Ask the connection task to shut the socket down.
    ///
    /// The permit is stored, so a close requested before the task starts
    /// waiting is not lost.
    pub fn request_close(&self) {
        self.close.notify_one();
    }

    /// Resolves once [`request_close`](Self::request_close) has been called.
    pub async fn close_requested(&self) {
        self.close.notified().await;
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Set of currently-open connections.
///
/// Registration is idempotent: registering the same handle twice replaces the
/// entry, deregistering an unknown id is a no-op.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a connection.
    pub fn register(&self, conn: ConnectionHandle) {
        let id = conn.id();
        let previous = self.write().insert(id, conn);
        if previous.is_none() {
            tracing::debug!(connection = %id, "Connection registered");
        }
    }

    /// Remove a connection. Returns the handle if it was registered.
    pub fn deregister(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        let removed = self.write().remove(&id);
        if removed.is_some() {
            tracing::debug!(connection = %id, "Connection deregistered");
        }
        removed
    }

    /// Call `f` for every connection registered at the moment of the call.
    ///
    /// `f` runs without the registry lock held, so it may itself register or
    /// deregister connections.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&ConnectionHandle),
    {
        for conn in self.snapshot() {
            f(&conn);
        }
    }

    /// Copy of the current membership.
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.read().values().cloned().collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated
    // (single insert/remove), so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.connections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.connections.write().unwrap_or_else(|e| e.into_inner())
    }
}
