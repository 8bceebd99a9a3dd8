//! Event delivery to connections
//!
//! The [`Dispatcher`] turns `GameEvent`s into JSON and hands them to a
//! [`Transport`]. Delivery failures are logged and swallowed: a peer that is
//! gone must never stop its opponent from being notified.

use crate::connections::ConnectionId;
use log::{error, warn};
use shared::GameEvent;
use std::sync::Arc;
use thiserror::Error;

pub const SERVER_ERROR_TEXT: &str = "Error: something went wrong server-side";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("connection {0} is gone")]
    ConnectionGone(ConnectionId),
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outbound side of the connection layer.
pub trait Transport: Send + Sync {
    fn send(&self, connection: ConnectionId, payload: String) -> Result<(), DispatchError>;
    fn close(&self, connection: ConnectionId);
}

/// One event addressed to one connection.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub connection: ConnectionId,
    pub event: GameEvent,
    /// Close the connection once the event is queued
    pub close: bool,
}

impl Delivery {
    pub fn new(connection: ConnectionId, event: GameEvent) -> Self {
        Self {
            connection,
            event,
            close: false,
        }
    }

    pub fn closing(connection: ConnectionId, event: GameEvent) -> Self {
        Self {
            connection,
            event,
            close: true,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn send_text(&self, connection: ConnectionId, text: &str) {
        if let Err(e) = self.transport.send(connection, text.to_string()) {
            warn!("Dropping message for {}: {}", connection, e);
        }
    }

    /// Serializes and sends one event. A serialization failure falls back to
    /// a plain-text server error for that peer.
    pub fn deliver(&self, delivery: &Delivery) {
        match delivery.event.to_json() {
            Ok(payload) => {
                if let Err(e) = self.transport.send(delivery.connection, payload) {
                    warn!(
                        "Could not deliver {:?} to {}: {}",
                        delivery.event.event_type, delivery.connection, e
                    );
                }
            }
            Err(e) => {
                error!("{}", DispatchError::Serialization(e));
                self.send_text(delivery.connection, SERVER_ERROR_TEXT);
            }
        }

        if delivery.close {
            self.transport.close(delivery.connection);
        }
    }

    /// Delivers events in order. Each one is attempted regardless of
    /// whether the previous ones reached their peer.
    pub fn deliver_all(&self, deliveries: &[Delivery]) {
        for delivery in deliveries {
            self.deliver(delivery);
        }
    }

    pub fn close(&self, connection: ConnectionId) {
        self.transport.close(connection);
    }
}
