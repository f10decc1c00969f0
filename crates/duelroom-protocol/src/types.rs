//! Identity types and the room/queue snapshots handed back to clients.
//!
//! Everything here crosses the wire, so every type derives serde. The
//! registry also caches [`JoinInfo`] values, which is why they are plain
//! owned data with no references into room state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The well-known id of the matchmaking queue.
pub const MATCHMAKING_ROOM: &str = "matchmaking";

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable identity of a user, issued by the external account system.
///
/// Serialized as a plain string (`"u-42"`, not `{"0": "u-42"}`).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty ids never refer to a real account.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a room. Minted rooms use random hex ids; the queue uses
/// [`MATCHMAKING_ROOM`].
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id the matchmaking queue is bound to.
    pub fn matchmaking() -> Self {
        Self::new(MATCHMAKING_ROOM)
    }

    pub fn is_matchmaking(&self) -> bool {
        self.0 == MATCHMAKING_ROOM
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A user profile as supplied by the client in join events.
///
/// The core treats it as immutable. `rating` is carried along but never
/// consulted: pairing is strictly first-in-first-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "elo")]
    pub rating: i32,
}

/// One of the two designated participants of a room.
///
/// The identity is fixed when the room is created; only `active` flips
/// as the competitor's connection joins and leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    #[serde(flatten)]
    pub user: User,
    pub active: bool,
    pub score: u32,
}

impl Competitor {
    /// A competitor that has not joined yet.
    pub fn inactive(user: User) -> Self {
        Self {
            user,
            active: false,
            score: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Roles and statuses
// ---------------------------------------------------------------------------

/// The role a user was admitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Competitor,
    Spectator,
    /// Waiting in the matchmaking queue.
    Queued,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Competitor => "competitor",
            Self::Spectator => "spectator",
            Self::Queued => "queued",
        };
        f.write_str(s)
    }
}

/// Coarse status of a duel room.
///
/// ```text
/// AwaitingCompetitors ──(both competitors joined once)──→ Populated
/// ```
///
/// Round progression and scoring belong to the game layer; this core only
/// tracks whether the room has been populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    #[default]
    AwaitingCompetitors,
    Populated,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingCompetitors => f.write_str("awaiting-competitors"),
            Self::Populated => f.write_str("populated"),
        }
    }
}

/// Status reported to a user waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueStatus {
    #[default]
    InQueue,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Snapshot of a duel room, tagged with the role of the user it was
/// produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoomInfo {
    pub room_id: RoomId,
    pub competitors: BTreeMap<UserId, Competitor>,
    pub round_number: u32,
    pub match_status: MatchStatus,
    pub score: BTreeMap<UserId, u32>,
    pub role: Role,
}

/// What a queued user is told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub room_id: RoomId,
    pub status: QueueStatus,
    pub role: Role,
}

impl QueueInfo {
    /// The status every successful enqueue reports.
    pub fn queued(room_id: RoomId) -> Self {
        Self {
            room_id,
            status: QueueStatus::InQueue,
            role: Role::Queued,
        }
    }
}

/// The result of a successful join: a room snapshot or a queue status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinInfo {
    Room(UserRoomInfo),
    Queue(QueueInfo),
}

impl JoinInfo {
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Room(info) => &info.room_id,
            Self::Queue(info) => &info.room_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Room(info) => info.role,
            Self::Queue(info) => info.role,
        }
    }
}
