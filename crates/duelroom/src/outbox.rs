//! Per-connection outbound queues.
//!
//! Every connection handler registers an unbounded channel here and
//! drains it into its socket. Anything that needs to reach a client it
//! does not own (a broadcast to a room, the `matched` notice from the
//! queue) goes through the outbox instead of touching the socket.

use std::collections::HashMap;
use std::sync::Arc;

use duelroom_protocol::{RoomId, ServerEvent};
use duelroom_room::PairingNotifier;
use duelroom_transport::ConnectionId;
use tokio::sync::{mpsc, Mutex};

/// Channel sender for delivering events to one connection handler.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Fan-out table from connection handle to its outbound channel.
///
/// Cheap to clone; all clones share one table.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    senders: Arc<Mutex<HashMap<ConnectionId, EventSender>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the outbound channel for a connection.
    pub async fn register(
        &self,
        connection: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().await.insert(connection, tx);
        rx
    }

    pub async fn unregister(&self, connection: ConnectionId) {
        self.senders.lock().await.remove(&connection);
    }

    /// Queues an event for one connection. Returns `false` if the
    /// connection is gone.
    pub async fn send(&self, connection: ConnectionId, event: ServerEvent) -> bool {
        let senders = self.senders.lock().await;
        match senders.get(&connection) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Queues a copy of `event` for each connection. Returns how many
    /// were still reachable.
    pub async fn broadcast(
        &self,
        connections: &[ConnectionId],
        event: &ServerEvent,
    ) -> usize {
        let senders = self.senders.lock().await;
        connections
            .iter()
            .filter_map(|connection| senders.get(connection))
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }
}

impl PairingNotifier for Outbox {
    async fn notify_matched(&self, room_id: &RoomId, connections: &[ConnectionId]) {
        let event = ServerEvent::Matched {
            room_id: room_id.clone(),
        };
        let delivered = self.broadcast(connections, &event).await;
        if delivered < connections.len() {
            tracing::warn!(
                %room_id,
                delivered,
                expected = connections.len(),
                "matched notice did not reach every competitor"
            );
        } else {
            tracing::info!(%room_id, "matched notice sent");
        }
    }
}
