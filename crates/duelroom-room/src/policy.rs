//! The [`JoinPolicy`] trait: what a room hands back after a seat is taken.
//!
//! A duel room answers with a full room snapshot. The matchmaking queue
//! is the same room structure with a different policy: it answers with a
//! queue status and, once two users are waiting, pops them as a pair.
//!
//! Policies run synchronously under the room's lock, right after the
//! membership change, so they see (and may edit) exactly the state the
//! join produced.

use duelroom_protocol::{JoinInfo, QueueInfo, Role, RoomId, UserId};

use crate::room::Membership;

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Handed back to the joiner and cached in the registry.
    pub info: JoinInfo,

    /// Two users the policy removed from the room to be matched, oldest
    /// first.
    pub pairing: Option<[UserId; 2]>,
}

/// Decides what a join produces. Implemented by [`DuelPolicy`] and
/// [`FifoPairing`].
pub trait JoinPolicy: Send + Sync + 'static {
    /// Called under the room lock after `seat` was granted.
    fn admit(
        &self,
        room_id: &RoomId,
        members: &mut Membership,
        seat: Role,
    ) -> Admission;

    /// How a vacated seat is reported to the caller. Defaults to the
    /// seat itself.
    fn role_for(&self, seat: Role) -> Role {
        seat
    }
}

/// Plain duel room: the joiner gets the room snapshot in their role.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuelPolicy;

impl JoinPolicy for DuelPolicy {
    fn admit(
        &self,
        room_id: &RoomId,
        members: &mut Membership,
        seat: Role,
    ) -> Admission {
        Admission {
            info: JoinInfo::Room(members.snapshot(room_id, seat)),
            pairing: None,
        }
    }
}

/// First-come, first-paired matchmaking.
///
/// Waiting users are the room's spectators. Every join answers with a
/// queue status; when two or more are waiting, the two longest-waiting
/// are removed and returned as a pairing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoPairing;

impl JoinPolicy for FifoPairing {
    fn admit(
        &self,
        room_id: &RoomId,
        members: &mut Membership,
        _seat: Role,
    ) -> Admission {
        let pairing = members.pop_pair();
        if let Some([first, second]) = &pairing {
            tracing::info!(%first, %second, "queue paired two users");
        }
        Admission {
            info: JoinInfo::Queue(QueueInfo::queued(room_id.clone())),
            pairing,
        }
    }

    fn role_for(&self, _seat: Role) -> Role {
        Role::Queued
    }
}
