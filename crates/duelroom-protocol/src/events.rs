//! Named events exchanged with clients, and the envelope that carries them.
//!
//! Events are adjacently tagged so a frame reads like
//! `{"event": "join-room", "data": {...}}`, which maps one-to-one onto the
//! named-event style browser clients already use.

use serde::{Deserialize, Serialize};

use crate::{QueueInfo, RoomId, User, UserRoomInfo};

/// The top-level frame. Each side numbers its own frames with `seq`;
/// `timestamp` is milliseconds since the sender's connection started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<E> {
    pub seq: u64,
    #[serde(default)]
    pub timestamp: u64,
    pub event: E,
}

impl<E> Envelope<E> {
    pub fn new(seq: u64, timestamp: u64, event: E) -> Self {
        Self {
            seq,
            timestamp,
            event,
        }
    }
}

/// A chat or system line delivered to everyone in a room.
///
/// `kind` is the client's message type (`"chat"`, `"buzz"`, `"system"`,
/// ...). The server relays it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
}

impl RoomMessage {
    /// A server-generated announcement.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            kind: "system".to_string(),
            text: text.into(),
            username: String::new(),
            role: String::new(),
        }
    }
}

/// Client → server events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// "Put me in the queue."
    JoinMatchmaking { user: User },

    /// "Put me in this room," as a competitor if I am one of its pair,
    /// otherwise as a spectator.
    JoinRoom { room_id: RoomId, user: User },

    /// "Relay this to everyone in the room."
    SendMessage {
        room_id: RoomId,
        #[serde(rename = "type")]
        kind: String,
        text: String,
        #[serde(default)]
        username: String,
        #[serde(default)]
        role: String,
    },

    /// "Take me out of this room."
    LeaveRoom { room_id: RoomId },
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Sent to both users of a fresh pairing.
    Matched { room_id: RoomId },

    /// Sent to a user that just joined a duel room.
    UpdateRoomInfo(UserRoomInfo),

    /// Sent to a user that just joined the queue.
    QueueStatus(QueueInfo),

    /// A line broadcast to a room.
    Message(RoomMessage),

    /// Something the user asked for was rejected. `code` follows HTTP
    /// conventions (400 bad request, 404 not found, 409 conflict, 412
    /// precondition failed).
    Error { code: u16, message: String },
}
