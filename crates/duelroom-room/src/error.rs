//! Error types for the room layer.

use duelroom_protocol::{RoomId, UserId};
use duelroom_registry::RegistryError;

/// Coarse classification of a [`RoomError`], used by the transport
/// adapter to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced room or user does not exist.
    NotFound,
    /// The request contradicts the user's current membership.
    Conflict,
    /// The room is not in a state that allows the operation.
    PreconditionFailed,
    /// The request itself is malformed.
    Invalid,
}

/// Errors that can occur during room and coordinator operations.
///
/// None of these are fatal: every one describes a request that was
/// rejected and left all state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The user or connection could not be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A room with this id already exists.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// The user already holds a seat in this room (active competitor or
    /// spectator).
    #[error("user {0} already in room {1}")]
    AlreadyInRoom(UserId, RoomId),

    /// The user is assigned to a different room.
    #[error("user {user_id} is in room {current}, not {requested}")]
    InAnotherRoom {
        user_id: UserId,
        current: RoomId,
        requested: RoomId,
    },

    /// The user holds no seat in this room.
    #[error("user {0} not in room {1}")]
    NotInRoom(UserId, RoomId),

    /// The user is not one of the room's two competitors.
    #[error("user {0} is not a competitor of room {1}")]
    NotCompetitor(UserId, RoomId),

    /// Delete refused: a competitor is still active or a spectator
    /// remains.
    #[error("room {0} still has members")]
    NotEmpty(RoomId),

    /// The matchmaking queue cannot be created or deleted by callers.
    #[error("room {0} is reserved")]
    Protected(RoomId),

    /// A room needs exactly two distinct competitors.
    #[error("invalid competitors: {0}")]
    InvalidCompetitors(String),
}

impl RoomError {
    /// Which bucket of the error taxonomy this falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Registry(_) | Self::NotCompetitor(..) => {
                ErrorKind::NotFound
            }
            Self::AlreadyExists(_)
            | Self::AlreadyInRoom(..)
            | Self::InAnotherRoom { .. }
            | Self::NotInRoom(..) => ErrorKind::Conflict,
            Self::NotEmpty(_) => ErrorKind::PreconditionFailed,
            Self::Protected(_) | Self::InvalidCompetitors(_) => {
                ErrorKind::Invalid
            }
        }
    }

    /// HTTP-style status code for error events sent to clients.
    pub fn code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::PreconditionFailed => 412,
            ErrorKind::Invalid => 400,
        }
    }
}
