//! Rooms, matchmaking, and coordination for duelroom.
//!
//! A room has two fixed competitor seats and any number of spectators.
//! The matchmaking queue is the same structure with a pairing policy.
//! The [`Coordinator`] ties rooms to the user registry and is the only
//! entry point the transport layer talks to.
//!
//! # Key types
//!
//! - [`Coordinator`]: join, leave, disconnect, create/delete rooms
//! - [`Room`]: seat bookkeeping behind its own lock
//! - [`JoinPolicy`]: what a join hands back ([`DuelPolicy`], [`FifoPairing`])
//! - [`Queue`]: FIFO matchmaking; opens a room for each pair through a
//!   [`RoomFactory`] and announces it through a [`PairingNotifier`]

#![allow(async_fn_in_trait)]

mod coordinator;
mod error;
mod policy;
mod queue;
mod room;

pub use coordinator::{Coordinator, Departure, Joined};
pub use error::{ErrorKind, RoomError};
pub use policy::{Admission, DuelPolicy, FifoPairing, JoinPolicy};
pub use queue::{Match, PairingNotifier, Queue, RoomFactory};
pub use room::{DeleteConditions, Membership, Room};
