//! Wire protocol for duelroom.
//!
//! This crate defines the vocabulary shared by every other layer:
//!
//! - **Identity and snapshots** ([`UserId`], [`RoomId`], [`User`],
//!   [`UserRoomInfo`], [`QueueInfo`], [`JoinInfo`]): what the coordinator
//!   hands back to callers.
//! - **Events** ([`ClientEvent`], [`ServerEvent`], [`Envelope`]): the
//!   named events that travel on the wire.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how envelopes become frames.
//!
//! ```text
//! Transport (frames) → Protocol (Envelope<ClientEvent>) → Coordinator
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, Envelope, RoomMessage, ServerEvent};
pub use types::{
    Competitor, JoinInfo, MatchStatus, QueueInfo, QueueStatus, Role, RoomId,
    User, UserId, UserRoomInfo, MATCHMAKING_ROOM,
};
