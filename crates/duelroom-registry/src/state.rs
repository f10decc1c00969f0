//! Per-user records kept by the registry.

use duelroom_protocol::{JoinInfo, RoomId, User, UserId};
use duelroom_transport::ConnectionId;

/// Everything the coordinator knows about one user.
///
/// Created the first time an identity is seen. Later sightings only swap
/// `connection`; the room assignment and cached info survive reconnects.
/// `connection` is `None` once another user has claimed the handle.
#[derive(Debug, Clone, PartialEq)]
pub struct UserState {
    /// Profile as supplied on first sighting.
    pub user: User,

    /// The connection currently speaking for this user, if any.
    pub connection: Option<ConnectionId>,

    /// The room (or queue) the user currently occupies, if any.
    pub current_room: Option<RoomId>,

    /// The last room/queue snapshot handed back to this user.
    pub cached_info: Option<JoinInfo>,
}

impl UserState {
    pub(crate) fn new(user: User, connection: ConnectionId) -> Self {
        Self {
            user,
            connection: Some(connection),
            current_room: None,
            cached_info: None,
        }
    }
}

/// Either way of naming a user: by identity or by the connection that
/// currently speaks for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    User(UserId),
    Connection(ConnectionId),
}

impl From<UserId> for UserRef {
    fn from(id: UserId) -> Self {
        Self::User(id)
    }
}

impl From<&UserId> for UserRef {
    fn from(id: &UserId) -> Self {
        Self::User(id.clone())
    }
}

impl From<ConnectionId> for UserRef {
    fn from(connection: ConnectionId) -> Self {
        Self::Connection(connection)
    }
}
