//! A single room: two fixed competitor seats plus an ordered list of
//! spectators, all behind one lock.
//!
//! Every membership change runs the room's [`JoinPolicy`] under the same
//! guard, so the snapshot handed back to a joiner (and any pairing the
//! policy pops) reflects exactly the state the join produced.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use duelroom_protocol::{
    Competitor, MatchStatus, Role, RoomId, User, UserId, UserRoomInfo,
};
use tokio::sync::Mutex;

use crate::policy::{Admission, DuelPolicy, JoinPolicy};
use crate::RoomError;

/// Seat bookkeeping for one room.
///
/// Competitors are fixed at creation; joining and leaving only flips
/// their `active` flag. Spectators are anyone else, kept in arrival order.
#[derive(Debug)]
pub struct Membership {
    competitors: BTreeMap<UserId, Competitor>,
    spectators: VecDeque<UserId>,
    match_status: MatchStatus,
    round_number: u32,
    score: BTreeMap<UserId, u32>,
    /// Competitors that have been active at least once.
    arrived: BTreeSet<UserId>,
}

impl Membership {
    fn new(competitors: Vec<User>) -> Self {
        let score = competitors.iter().map(|u| (u.id.clone(), 0)).collect();
        let competitors = competitors
            .into_iter()
            .map(|u| (u.id.clone(), Competitor::inactive(u)))
            .collect();
        Self {
            competitors,
            spectators: VecDeque::new(),
            match_status: MatchStatus::AwaitingCompetitors,
            round_number: 1,
            score,
            arrived: BTreeSet::new(),
        }
    }

    /// Builds the room snapshot a member in `role` receives.
    pub fn snapshot(&self, room_id: &RoomId, role: Role) -> UserRoomInfo {
        UserRoomInfo {
            room_id: room_id.clone(),
            competitors: self.competitors.clone(),
            round_number: self.round_number,
            match_status: self.match_status,
            score: self.score.clone(),
            role,
        }
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    /// Removes the two longest-waiting spectators, oldest first. Leaves
    /// the list untouched when fewer than two are waiting.
    pub fn pop_pair(&mut self) -> Option<[UserId; 2]> {
        if self.spectators.len() < 2 {
            return None;
        }
        let first = self.spectators.pop_front()?;
        let second = self.spectators.pop_front()?;
        Some([first, second])
    }

    fn holds(&self, user_id: &UserId) -> bool {
        self.competitors.get(user_id).is_some_and(|c| c.active)
            || self.spectators.contains(user_id)
    }

    fn admit(
        &mut self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Role, RoomError> {
        if let Some(competitor) = self.competitors.get_mut(user_id) {
            if competitor.active {
                return Err(RoomError::AlreadyInRoom(
                    user_id.clone(),
                    room_id.clone(),
                ));
            }
            competitor.active = true;
            self.arrived.insert(user_id.clone());

            if self.match_status == MatchStatus::AwaitingCompetitors
                && self.arrived.len() == self.competitors.len()
            {
                self.match_status = MatchStatus::Populated;
                tracing::info!(%room_id, "both competitors arrived");
            }
            return Ok(Role::Competitor);
        }

        if self.spectators.contains(user_id) {
            return Err(RoomError::AlreadyInRoom(
                user_id.clone(),
                room_id.clone(),
            ));
        }
        self.spectators.push_back(user_id.clone());
        Ok(Role::Spectator)
    }

    fn vacate(
        &mut self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Role, RoomError> {
        if let Some(competitor) = self.competitors.get_mut(user_id) {
            if competitor.active {
                competitor.active = false;
                return Ok(Role::Competitor);
            }
        } else if let Some(pos) =
            self.spectators.iter().position(|id| id == user_id)
        {
            self.spectators.remove(pos);
            return Ok(Role::Spectator);
        }
        Err(RoomError::NotInRoom(user_id.clone(), room_id.clone()))
    }

    fn delete_conditions(&self) -> DeleteConditions {
        DeleteConditions {
            empty_competitors: !self.competitors.values().any(|c| c.active),
            empty_spectators: self.spectators.is_empty(),
            match_status: self.match_status,
            round_number: self.round_number,
        }
    }
}

/// What a caller needs to know before tearing a room down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteConditions {
    /// No competitor is currently active.
    pub empty_competitors: bool,
    /// No spectator remains.
    pub empty_spectators: bool,
    pub match_status: MatchStatus,
    pub round_number: u32,
}

impl DeleteConditions {
    /// A room may be deleted only once nobody occupies it.
    pub fn is_satisfied(&self) -> bool {
        self.empty_competitors && self.empty_spectators
    }
}

/// A room and the policy that decides what a join hands back.
pub struct Room {
    id: RoomId,
    members: Mutex<Membership>,
    policy: Box<dyn JoinPolicy>,
}

impl Room {
    /// Creates a duel room for the two given competitors, both inactive.
    pub fn duel(id: RoomId, competitors: [User; 2]) -> Self {
        Self::with_policy(id, competitors.into(), DuelPolicy)
    }

    /// Creates a room with an arbitrary competitor list and join policy.
    pub fn with_policy(
        id: RoomId,
        competitors: Vec<User>,
        policy: impl JoinPolicy,
    ) -> Self {
        Self {
            id,
            members: Mutex::new(Membership::new(competitors)),
            policy: Box::new(policy),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Seats the user.
    ///
    /// An inactive competitor becomes active; anyone who is not a
    /// competitor is appended to the spectators. The room's policy then
    /// runs under the same lock and decides what the joiner gets back.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyInRoom`]: already an active competitor or a
    ///   spectator here
    pub async fn join(&self, user_id: &UserId) -> Result<Admission, RoomError> {
        let mut members = self.members.lock().await;
        let seat = members.admit(&self.id, user_id)?;
        tracing::debug!(room_id = %self.id, %user_id, %seat, "seat taken");
        Ok(self.policy.admit(&self.id, &mut members, seat))
    }

    /// Vacates the user's seat and returns the role they held.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`]: neither an active competitor nor a
    ///   spectator here
    pub async fn leave(&self, user_id: &UserId) -> Result<Role, RoomError> {
        let seat = self.members.lock().await.vacate(&self.id, user_id)?;
        tracing::debug!(room_id = %self.id, %user_id, %seat, "seat vacated");
        Ok(self.policy.role_for(seat))
    }

    /// Returns `true` if the user is an active competitor or a spectator.
    pub async fn has(&self, user_id: &UserId) -> bool {
        self.members.lock().await.holds(user_id)
    }

    /// The competitor record for `user_id`, if they hold a seat.
    pub async fn competitor(&self, user_id: &UserId) -> Option<Competitor> {
        self.members.lock().await.competitors.get(user_id).cloned()
    }

    /// Active competitors, then spectators in arrival order.
    pub async fn members(&self) -> Vec<UserId> {
        let members = self.members.lock().await;
        members
            .competitors
            .values()
            .filter(|c| c.active)
            .map(|c| c.user.id.clone())
            .chain(members.spectators.iter().cloned())
            .collect()
    }

    pub async fn spectator_count(&self) -> usize {
        self.members.lock().await.spectator_count()
    }

    pub async fn delete_conditions(&self) -> DeleteConditions {
        self.members.lock().await.delete_conditions()
    }

    /// Snapshot of the room as seen by a member in `role`.
    pub async fn info(&self, role: Role) -> UserRoomInfo {
        self.members.lock().await.snapshot(&self.id, role)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room").field("id", &self.id).finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
