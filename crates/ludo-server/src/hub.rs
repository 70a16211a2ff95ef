//! Broadcast hub: fan-out of room messages to live connections.
//!
//! Each connection is represented by the sending half of a bounded
//! [`mpsc`] queue; a writer task on the other end drains it into the
//! socket. Broadcasting never waits on a socket: it `try_send`s into each
//! queue. A queue that is closed (the writer gave up) or full (the client
//! stopped reading) counts as a dead sink and is pruned on the spot.

use std::collections::BTreeMap;

use ludo_types::ServerMessage;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::store::RoomSlot;

/// Sending half of a connection's outbound queue.
pub type Outbound = mpsc::Sender<String>;

/// Identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What one broadcast achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the message was queued for.
    pub delivered: usize,
    /// Dead connections removed during the broadcast.
    pub pruned: usize,
}

/// Connections currently viewing one room.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    members: BTreeMap<ConnectionId, Outbound>,
}

impl ConnectionSet {
    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn send_text(&mut self, text: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        self.members.retain(|id, tx| match tx.try_send(text.to_owned()) {
            Ok(()) => {
                report.delivered = report.delivered.saturating_add(1);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(connection = %id, "Outbound queue full, dropping connection");
                report.pruned = report.pruned.saturating_add(1);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection = %id, "Connection closed, pruning");
                report.pruned = report.pruned.saturating_add(1);
                false
            }
        });
        report
    }
}

/// Serialize a message for the wire.
///
/// Returns `None` (after logging) if serialization fails.
pub fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(kind = message.kind(), "Failed to serialize message: {e}");
            None
        }
    }
}

impl RoomSlot {
    /// Add a connection to this room.
    pub async fn register(&self, id: ConnectionId, tx: Outbound) {
        let mut connections = self.connections.lock().await;
        connections.members.insert(id, tx);
        debug!(room_id = %self.id(), connection = %id, viewers = connections.len(), "Connection registered");
    }

    /// Remove a connection. Returns whether it was still registered.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        let removed = connections.members.remove(&id).is_some();
        if removed {
            debug!(room_id = %self.id(), connection = %id, viewers = connections.len(), "Connection unregistered");
        }
        removed
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Send `message` to every connection, pruning dead ones.
    pub async fn broadcast(&self, message: &ServerMessage) -> BroadcastReport {
        let Some(text) = encode(message) else {
            return BroadcastReport::default();
        };
        let report = self.connections.lock().await.send_text(&text);
        debug!(
            room_id = %self.id(),
            kind = message.kind(),
            delivered = report.delivered,
            pruned = report.pruned,
            "Broadcast"
        );
        report
    }

    /// Send `message` to one connection.
    ///
    /// Returns whether the message was queued. A dead sink stays
    /// registered until the next broadcast prunes it.
    pub async fn send_to(&self, id: ConnectionId, message: &ServerMessage) -> bool {
        let Some(text) = encode(message) else {
            return false;
        };
        let connections = self.connections.lock().await;
        let Some(tx) = connections.members.get(&id) else {
            return false;
        };
        match tx.try_send(text) {
            Ok(()) => true,
            Err(e) => {
                debug!(room_id = %self.id(), connection = %id, "Direct send failed: {e}");
                false
            }
        }
    }
}
