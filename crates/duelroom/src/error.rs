//! Unified error type for the duelroom server.

use duelroom_protocol::ProtocolError;
use duelroom_room::RoomError;
use duelroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A rejected room or registry operation.
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl DuelError {
    /// Status code reported to the client in an `error` event.
    pub fn code(&self) -> u16 {
        match self {
            Self::Room(e) => e.code(),
            Self::Protocol(_) => 400,
            Self::Transport(_) => 500,
        }
    }
}
