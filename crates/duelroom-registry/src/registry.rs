//! The user registry: who is connected through which handle, and where
//! they currently are.
//!
//! # Concurrency note
//!
//! `UserRegistry` is a plain single-owner structure. The coordinator keeps
//! it behind its directory lock together with the room map, so a
//! registration, a reconnect, or a room assignment is always checked and
//! applied under one guard.

use std::collections::HashMap;

use duelroom_protocol::{JoinInfo, RoomId, User, UserId};
use duelroom_transport::ConnectionId;

use crate::{RegistryError, UserRef, UserState};

/// Maps user identities to their [`UserState`].
///
/// ```text
/// register_or_reconnect() ──→ [no room] ──assign()──→ [in room]
///          │                      ↑                       │
///          └─ same id, new handle ┘ ←──────release()──────┘
/// ```
///
/// Entries are never evicted; a user that goes away for good keeps its
/// record until the process exits.
#[derive(Debug, Default)]
pub struct UserRegistry {
    /// All known users, keyed by identity.
    users: HashMap<UserId, UserState>,

    /// Reverse index from connection handle to the user it speaks for.
    /// Kept in sync with `users[..].connection`.
    connections: HashMap<ConnectionId, UserId>,
}

impl UserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sighting of `user` on `connection`.
    ///
    /// Unknown identities get a fresh state with no room. Known identities
    /// only have their connection handle replaced (a reconnect); the room
    /// assignment and cached info are left untouched. If the handle was
    /// speaking for someone else, that user is detached from it and keeps
    /// their room until they reconnect or leave. Always returns `true`.
    pub fn register_or_reconnect(
        &mut self,
        user: User,
        connection: ConnectionId,
    ) -> bool {
        let user_id = user.id.clone();

        if let Some(state) = self.users.get_mut(&user_id) {
            let previous = state.connection.replace(connection);
            if let Some(previous) = previous.filter(|p| *p != connection) {
                if self.connections.get(&previous) == Some(&user_id) {
                    self.connections.remove(&previous);
                }
                tracing::info!(
                    %user_id,
                    from = %previous,
                    to = %connection,
                    "user reconnected under a new connection"
                );
            }
        } else {
            self.users
                .insert(user_id.clone(), UserState::new(user, connection));
            tracing::info!(%user_id, %connection, "user registered");
        }

        if let Some(other) =
            self.connections.insert(connection, user_id.clone())
        {
            if other != user_id {
                self.detach(&other, connection);
                tracing::warn!(
                    %connection,
                    previous_user = %other,
                    %user_id,
                    "connection now speaks for a different user"
                );
            }
        }
        true
    }

    /// Returns `true` if the identity has been seen.
    pub fn has_user(&self, user_id: &UserId) -> bool {
        self.users.contains_key(user_id)
    }

    /// Resolves a user reference to a registered identity.
    ///
    /// # Errors
    /// - [`RegistryError::UnknownUser`]: the id was never registered
    /// - [`RegistryError::UnknownConnection`]: no user owns the handle
    pub fn identify(&self, who: &UserRef) -> Result<UserId, RegistryError> {
        match who {
            UserRef::User(id) => {
                if self.users.contains_key(id) {
                    Ok(id.clone())
                } else {
                    Err(RegistryError::UnknownUser(id.clone()))
                }
            }
            UserRef::Connection(connection) => self
                .connections
                .get(connection)
                .cloned()
                .ok_or(RegistryError::UnknownConnection(*connection)),
        }
    }

    /// Where the user is: `Ok(Some(room))`, `Ok(None)` when registered but
    /// in no room.
    pub fn where_is(
        &self,
        who: &UserRef,
    ) -> Result<Option<RoomId>, RegistryError> {
        Ok(self.get(who)?.current_room.clone())
    }

    /// A copy of the user's profile.
    pub fn user(&self, who: &UserRef) -> Result<User, RegistryError> {
        Ok(self.get(who)?.user.clone())
    }

    /// A copy of the last join result handed to the user.
    pub fn cached_info(
        &self,
        who: &UserRef,
    ) -> Result<Option<JoinInfo>, RegistryError> {
        Ok(self.get(who)?.cached_info.clone())
    }

    /// A copy of the user's whole state.
    pub fn state(&self, who: &UserRef) -> Result<UserState, RegistryError> {
        self.get(who).cloned()
    }

    /// The connection currently speaking for the user.
    pub fn connection_of(
        &self,
        user_id: &UserId,
    ) -> Result<ConnectionId, RegistryError> {
        self.users
            .get(user_id)
            .ok_or_else(|| RegistryError::UnknownUser(user_id.clone()))?
            .connection
            .ok_or_else(|| RegistryError::Detached(user_id.clone()))
    }

    /// Records a successful join.
    pub fn assign(
        &mut self,
        user_id: &UserId,
        room_id: RoomId,
        info: JoinInfo,
    ) -> Result<(), RegistryError> {
        let state = self.get_mut(user_id)?;
        state.current_room = Some(room_id);
        state.cached_info = Some(info);
        Ok(())
    }

    /// Clears the user's room assignment, returning the room they were
    /// in. The cached info is kept.
    pub fn release(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<RoomId>, RegistryError> {
        Ok(self.get_mut(user_id)?.current_room.take())
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if nobody has registered yet.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Drops `user_id`'s claim on `connection`, if it still holds it.
    fn detach(&mut self, user_id: &UserId, connection: ConnectionId) {
        if let Some(state) = self.users.get_mut(user_id) {
            if state.connection == Some(connection) {
                state.connection = None;
            }
        }
    }

    fn get(&self, who: &UserRef) -> Result<&UserState, RegistryError> {
        let user_id = self.identify(who)?;
        self.users
            .get(&user_id)
            .ok_or(RegistryError::UnknownUser(user_id))
    }

    fn get_mut(
        &mut self,
        user_id: &UserId,
    ) -> Result<&mut UserState, RegistryError> {
        self.users
            .get_mut(user_id)
            .ok_or_else(|| RegistryError::UnknownUser(user_id.clone()))
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use duelroom_protocol::QueueInfo;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn user(id: &str) -> User {
        User {
            id: UserId::from(id),
            name: format!("name-{id}"),
            email: format!("{id}@example.com"),
            rating: 1000,
        }
    }

    fn uid(id: &str) -> UserId {
        UserId::from(id)
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn queued() -> JoinInfo {
        JoinInfo::Queue(QueueInfo::queued(RoomId::matchmaking()))
    }

    // =====================================================================
    // register_or_reconnect()
    // =====================================================================

    #[test]
    fn test_register_new_user_has_no_room() {
        let mut reg = UserRegistry::new();

        assert!(reg.register_or_reconnect(user("u1"), conn(1)));

        assert!(reg.has_user(&uid("u1")));
        assert_eq!(reg.where_is(&uid("u1").into()), Ok(None));
        assert_eq!(reg.cached_info(&uid("u1").into()), Ok(None));
        assert_eq!(reg.connection_of(&uid("u1")), Ok(conn(1)));
    }

    #[test]
    fn test_register_same_handle_twice_is_noop() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("u1"), conn(1));

        assert!(reg.register_or_reconnect(user("u1"), conn(1)));

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.identify(&conn(1).into()), Ok(uid("u1")));
    }

    #[test]
    fn test_reconnect_swaps_handle_and_preserves_room() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("u1"), conn(1));
        reg.assign(&uid("u1"), RoomId::matchmaking(), queued())
            .unwrap();

        assert!(reg.register_or_reconnect(user("u1"), conn(2)));

        assert_eq!(reg.connection_of(&uid("u1")), Ok(conn(2)));
        assert_eq!(
            reg.where_is(&uid("u1").into()),
            Ok(Some(RoomId::matchmaking()))
        );
        assert_eq!(reg.cached_info(&uid("u1").into()), Ok(Some(queued())));
    }

    #[test]
    fn test_reconnect_retires_old_handle() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("u1"), conn(1));
        reg.register_or_reconnect(user("u1"), conn(2));

        assert_eq!(
            reg.identify(&conn(1).into()),
            Err(RegistryError::UnknownConnection(conn(1)))
        );
        assert_eq!(reg.identify(&conn(2).into()), Ok(uid("u1")));
    }

    #[test]
    fn test_reconnect_keeps_first_profile() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("u1"), conn(1));

        let mut renamed = user("u1");
        renamed.name = "someone else".into();
        reg.register_or_reconnect(renamed, conn(2));

        assert_eq!(reg.user(&uid("u1").into()).unwrap().name, "name-u1");
    }

    // =====================================================================
    // identify() / lookups
    // =====================================================================

    #[test]
    fn test_identify_unknown_user_returns_error() {
        let reg = UserRegistry::new();

        assert_eq!(
            reg.identify(&uid("ghost").into()),
            Err(RegistryError::UnknownUser(uid("ghost")))
        );
    }

    #[test]
    fn test_identify_by_connection_resolves_user() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("u1"), conn(1));
        reg.register_or_reconnect(user("u2"), conn(2));

        assert_eq!(reg.identify(&conn(2).into()), Ok(uid("u2")));
        assert_eq!(reg.user(&conn(1).into()).unwrap().id, uid("u1"));
    }

    #[test]
    fn test_where_is_unknown_connection_fails() {
        let reg = UserRegistry::new();

        assert_eq!(
            reg.where_is(&conn(9).into()),
            Err(RegistryError::UnknownConnection(conn(9)))
        );
    }

    #[test]
    fn test_state_is_a_copy() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("u1"), conn(1));

        let mut copy = reg.state(&uid("u1").into()).unwrap();
        copy.current_room = Some(RoomId::from("elsewhere"));

        assert_eq!(reg.where_is(&uid("u1").into()), Ok(None));
    }

    // =====================================================================
    // assign() / release()
    // =====================================================================

    #[test]
    fn test_release_clears_room_but_keeps_cached_info() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("u1"), conn(1));
        reg.assign(&uid("u1"), RoomId::matchmaking(), queued())
            .unwrap();

        let left = reg.release(&uid("u1")).unwrap();

        assert_eq!(left, Some(RoomId::matchmaking()));
        assert_eq!(reg.where_is(&uid("u1").into()), Ok(None));
        assert_eq!(reg.cached_info(&uid("u1").into()), Ok(Some(queued())));
    }

    #[test]
    fn test_assign_unknown_user_returns_error() {
        let mut reg = UserRegistry::new();

        let result = reg.assign(&uid("ghost"), RoomId::matchmaking(), queued());

        assert_eq!(result, Err(RegistryError::UnknownUser(uid("ghost"))));
    }

    #[test]
    fn test_len_tracks_registered_users() {
        let mut reg = UserRegistry::new();
        assert!(reg.is_empty());

        reg.register_or_reconnect(user("u1"), conn(1));
        reg.register_or_reconnect(user("u2"), conn(2));
        reg.register_or_reconnect(user("u1"), conn(3));

        assert_eq!(reg.len(), 2);
    }

    // =====================================================================
    // Handle taken over by another user
    // =====================================================================

    #[test]
    fn test_claimed_handle_detaches_previous_owner() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("a"), conn(1));

        reg.register_or_reconnect(user("b"), conn(1));

        assert_eq!(reg.identify(&conn(1).into()), Ok(uid("b")));
        assert_eq!(
            reg.connection_of(&uid("a")),
            Err(RegistryError::Detached(uid("a")))
        );
        assert_eq!(reg.state(&uid("a").into()).unwrap().connection, None);
    }

    #[test]
    fn test_reconnect_of_detached_owner_keeps_new_owner_indexed() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("a"), conn(1));
        reg.register_or_reconnect(user("b"), conn(1));

        reg.register_or_reconnect(user("a"), conn(2));

        assert_eq!(reg.identify(&conn(1).into()), Ok(uid("b")));
        assert_eq!(reg.identify(&conn(2).into()), Ok(uid("a")));
        assert_eq!(reg.connection_of(&uid("a")), Ok(conn(2)));
        assert_eq!(reg.connection_of(&uid("b")), Ok(conn(1)));
    }

    #[test]
    fn test_stale_owner_cannot_unindex_new_owner() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("a"), conn(1));
        reg.register_or_reconnect(user("a"), conn(2));
        reg.register_or_reconnect(user("b"), conn(1));

        reg.register_or_reconnect(user("a"), conn(3));

        assert_eq!(reg.identify(&conn(1).into()), Ok(uid("b")));
        assert_eq!(
            reg.identify(&conn(2).into()),
            Err(RegistryError::UnknownConnection(conn(2)))
        );
    }

    #[test]
    fn test_claimed_handle_keeps_previous_owner_room() {
        let mut reg = UserRegistry::new();
        reg.register_or_reconnect(user("a"), conn(1));
        reg.assign(&uid("a"), RoomId::matchmaking(), queued()).unwrap();

        reg.register_or_reconnect(user("b"), conn(1));

        assert_eq!(
            reg.where_is(&uid("a").into()),
            Ok(Some(RoomId::matchmaking()))
        );
    }
}
