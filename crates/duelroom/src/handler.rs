//! Per-connection handler: event routing, replies, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task waits on two sources at once:
//!   1. frames from the client → decoded into [`ClientEvent`]s and applied
//!      to the coordinator
//!   2. its outbox channel → events for this client (replies, room
//!      broadcasts, the `matched` notice) written to the socket
//!
//! Replies go through the outbox too, so a joiner sees its own room info
//! before the broadcast announcing the join. Likewise the user whose join
//! completes a pair gets its `queue-status` reply before `matched`.

use std::sync::Arc;
use std::time::Instant;

use duelroom_protocol::{
    ClientEvent, Codec, Envelope, JoinInfo, ProtocolError, RoomId,
    RoomMessage, ServerEvent, User, UserId,
};
use duelroom_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::time::Duration;

use crate::server::ServerState;
use crate::DuelError;

/// Drop guard that runs the disconnect path when the handler exits.
///
/// `Drop` is synchronous, so the async cleanup is spawned as a
/// fire-and-forget task.
struct DisconnectGuard {
    connection: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let connection = self.connection;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.outbox.unregister(connection).await;
            if let Some(departure) = state.coordinator.disconnect(connection).await {
                tracing::debug!(
                    %connection,
                    user_id = %departure.user_id,
                    room_id = %departure.room_id,
                    "connection cleanup removed user from room"
                );
            }
        });
    }
}

/// Envelope stamping for one connection's outbound frames.
struct Writer {
    seq: u64,
    start: Instant,
}

impl Writer {
    fn new() -> Self {
        Self {
            seq: 1,
            start: Instant::now(),
        }
    }

    async fn send(
        &mut self,
        conn: &WebSocketConnection,
        codec: &impl Codec,
        event: ServerEvent,
    ) -> Result<(), DuelError> {
        let envelope = Envelope::new(
            next_seq(&mut self.seq),
            self.start.elapsed().as_millis() as u64,
            event,
        );
        let bytes = codec.encode(&envelope)?;
        conn.send(&bytes).await?;
        Ok(())
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), DuelError> {
    let connection = conn.id();
    tracing::debug!(%connection, "handling new connection");

    let mut outbound = state.outbox.register(connection).await;
    let _guard = DisconnectGuard {
        connection,
        state: Arc::clone(&state),
    };

    let mut writer = Writer::new();
    let idle_timeout = Duration::from_secs(state.config.idle_timeout_secs);
    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            received = conn.recv() => {
                let data = match received {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%connection, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%connection, error = %e, "recv error");
                        break;
                    }
                };
                idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);

                if let Err(e) = handle_frame(&state, connection, &data).await {
                    tracing::debug!(%connection, error = %e, "request rejected");
                    let event = ServerEvent::Error {
                        code: e.code(),
                        message: e.to_string(),
                    };
                    writer.send(&conn, &state.codec, event).await?;
                }
            }
            Some(event) = outbound.recv() => {
                writer.send(&conn, &state.codec, event).await?;
            }
            () = &mut idle => {
                tracing::info!(%connection, "connection timed out");
                if let Err(e) = conn.close().await {
                    tracing::debug!(%connection, error = %e, "close failed");
                }
                break;
            }
        }
    }

    // _guard drops here → disconnect fires.
    Ok(())
}

/// Decodes one client frame and applies it.
async fn handle_frame(
    state: &ServerState,
    connection: ConnectionId,
    data: &[u8],
) -> Result<(), DuelError> {
    let envelope: Envelope<ClientEvent> = state.codec.decode(data)?;

    match envelope.event {
        ClientEvent::JoinMatchmaking { user } => {
            let user_id = admit(state, user, connection).await?;
            let joined = state
                .coordinator
                .seat(&user_id, &RoomId::matchmaking())
                .await?;
            state.outbox.send(connection, reply_for(joined.info)).await;
            if let Some(matched) = &joined.matched {
                state.coordinator.announce(matched).await;
            }
        }

        ClientEvent::JoinRoom { room_id, user } => {
            let name = user.name.clone();
            let user_id = admit(state, user, connection).await?;
            let info = state.coordinator.join_room(&user_id, &room_id).await?;
            let role = info.role();
            state.outbox.send(connection, reply_for(info)).await;

            broadcast(
                state,
                &room_id,
                RoomMessage::system(format!(
                    "{role} \"{name}\" has joined the room."
                )),
            )
            .await?;
        }

        ClientEvent::SendMessage {
            room_id,
            kind,
            text,
            username,
            role,
        } => {
            tracing::debug!(%connection, %room_id, %kind, %username, "relaying message");
            broadcast(
                state,
                &room_id,
                RoomMessage {
                    kind,
                    text,
                    username,
                    role,
                },
            )
            .await?;
        }

        ClientEvent::LeaveRoom { room_id } => {
            let user_id = state.coordinator.get_user_id(connection).await?;
            let user = state.coordinator.get_user(&user_id).await?;
            let audience = state.coordinator.room_connections(&room_id).await?;

            let role = state.coordinator.leave_room(&user_id, &room_id).await?;

            let event = ServerEvent::Message(RoomMessage::system(format!(
                "{role} \"{}\" has left the room.",
                user.name
            )));
            state.outbox.broadcast(&audience, &event).await;
        }
    }
    Ok(())
}

/// Registers the user behind this connection (or swaps their handle on
/// reconnect).
async fn admit(
    state: &ServerState,
    user: User,
    connection: ConnectionId,
) -> Result<UserId, DuelError> {
    if user.id.is_empty() {
        return Err(ProtocolError::InvalidMessage("user id is empty".into()).into());
    }
    let user_id = user.id.clone();
    state.coordinator.register_or_reconnect(user, connection).await;
    Ok(user_id)
}

/// Sends a message event to everyone seated in the room.
async fn broadcast(
    state: &ServerState,
    room_id: &RoomId,
    message: RoomMessage,
) -> Result<(), DuelError> {
    let connections = state.coordinator.room_connections(room_id).await?;
    state
        .outbox
        .broadcast(&connections, &ServerEvent::Message(message))
        .await;
    Ok(())
}

fn reply_for(info: JoinInfo) -> ServerEvent {
    match info {
        JoinInfo::Room(info) => ServerEvent::UpdateRoomInfo(info),
        JoinInfo::Queue(info) => ServerEvent::QueueStatus(info),
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

#[cfg(test)]
mod tests {
    use duelroom_protocol::{QueueInfo, Role};

    use super::*;

    #[test]
    fn test_next_seq_counts_up_from_current() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }

    #[test]
    fn test_reply_for_queue_info_is_queue_status() {
        let info = JoinInfo::Queue(QueueInfo::queued(RoomId::matchmaking()));

        let event = reply_for(info);

        assert!(matches!(
            event,
            ServerEvent::QueueStatus(QueueInfo { role: Role::Queued, .. })
        ));
    }
}
