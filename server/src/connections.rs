//! Connection bookkeeping for the transport layer
//!
//! Every accepted WebSocket gets a [`ConnectionId`] and an unbounded outbound
//! queue. The network layer drains the queue into the socket from a dedicated
//! writer task, while the rest of the server only ever talks to connections
//! through the [`Transport`] trait implemented here.
//!
//! Keeping the queues behind ids means game code never holds a socket and a
//! slow or dead peer can never block delivery to its opponent.

use crate::dispatch::{DispatchError, Transport};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio::sync::mpsc;

/// Server-assigned identifier of one transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Instructions for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A text frame to write to the socket
    Text(String),
    /// Flush what was queued before, then close the socket
    Close,
}

/// Registry of live connections and their outbound queues
///
/// Ids start at 1 and are never reused during the lifetime of the hub, so a
/// stale id held by a session can only ever miss, never reach a newer peer.
#[derive(Debug)]
pub struct ConnectionHub {
    /// Outbound queue of every registered connection
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>>,
    /// Next id handed out by [`register`](ConnectionHub::register)
    next_id: AtomicU64,
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates an id for a new connection
    ///
    /// Returns the id together with the receiving end of its outbound queue.
    /// The caller owns the receiver and is expected to forward everything it
    /// yields to the underlying socket.
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        info!("Connection {} registered", id);

        (id, rx)
    }

    /// Forgets a connection. Returns false if it was already gone.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let removed = self
            .senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            info!("Connection {} removed", id);
        }
        removed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.senders.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, id: ConnectionId, message: Outbound) -> Result<(), DispatchError> {
        let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);
        let sender = senders.get(&id).ok_or(DispatchError::ConnectionGone(id))?;
        sender
            .send(message)
            .map_err(|_| DispatchError::ConnectionGone(id))
    }
}

impl Transport for ConnectionHub {
    fn send(&self, connection: ConnectionId, payload: String) -> Result<(), DispatchError> {
        debug!("-> {}: {}", connection, payload);
        self.push(connection, Outbound::Text(payload))
    }

    /// Queues a close behind any pending frames and drops the connection, so
    /// later sends to it fail fast.
    fn close(&self, connection: ConnectionId) {
        if self.push(connection, Outbound::Close).is_ok() {
            debug!("Closing connection {}", connection);
        }
        self.remove(connection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_unique_ids() {
        let hub = ConnectionHub::new();
        let (a, _rx_a) = hub.register();
        let (b, _rx_b) = hub.register();

        assert_ne!(a, b);
        assert_eq!(a, ConnectionId(1));
        assert_eq!(hub.len(), 2);
    }

    #[test]
    fn test_send_reaches_receiver() {
        let hub = ConnectionHub::new();
        let (id, mut rx) = hub.register();

        hub.send(id, "hello".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("hello".to_string()));
    }

    #[test]
    fn test_send_to_unknown_connection_fails() {
        let hub = ConnectionHub::new();
        let result = hub.send(ConnectionId(42), "lost".to_string());
        assert!(matches!(result, Err(DispatchError::ConnectionGone(ConnectionId(42)))));
    }

    #[test]
    fn test_close_flushes_then_removes() {
        let hub = ConnectionHub::new();
        let (id, mut rx) = hub.register();

        hub.send(id, "last words".to_string()).unwrap();
        hub.close(id);

        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("last words".to_string()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        assert!(!hub.contains(id));
        assert!(hub.send(id, "too late".to_string()).is_err());
    }

    #[test]
    fn test_dropped_receiver_is_reported() {
        let hub = ConnectionHub::new();
        let (id, rx) = hub.register();
        drop(rx);

        assert!(hub.send(id, "anyone?".to_string()).is_err());
        assert!(hub.remove(id));
        assert!(!hub.remove(id));
        assert!(hub.is_empty());
    }
}
