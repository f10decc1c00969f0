//! The coordinator: one entry point over the user registry, every room,
//! and the matchmaking queue.
//!
//! # Locking
//!
//! All registry state and the room map live in one [`Directory`] behind a
//! single async mutex. Every mutating operation takes that lock first and,
//! while holding it, at most one room's lock (directory → room, never the
//! reverse). The two steps of a join (room membership, then registry
//! assignment) therefore happen under one guard and are never observed
//! apart.
//!
//! When a join completes a pair, the pair is released from the queue and
//! its duel room is registered under that same guard, so neither user can
//! re-queue in between. Only the [`PairingNotifier`] runs after the guard
//! has been dropped, so it cannot deadlock against the join that produced
//! the pairing.
//!
//! `tokio::sync::Mutex` hands the lock out in FIFO order, so concurrent
//! joins against the queue are applied in the order they reached the
//! coordinator.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use duelroom_protocol::{
    Competitor, JoinInfo, Role, RoomId, User, UserId, UserRoomInfo,
};
use duelroom_registry::{UserRef, UserRegistry};
use duelroom_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::queue::{
    matchmaking_room, Match, PairingNotifier, Queue, RoomFactory,
};
use crate::{DeleteConditions, Room, RoomError};

/// A user removed from a room because their connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub role: Role,
}

/// Registry plus room map, guarded together.
#[derive(Debug)]
struct Directory {
    users: UserRegistry,
    rooms: HashMap<RoomId, Arc<Room>>,
}

impl Directory {
    fn room(&self, room_id: &RoomId) -> Result<Arc<Room>, RoomError> {
        self.rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Validates and registers a duel room, returning the competitors'
    /// current connection handles.
    fn create_room(
        &mut self,
        room_id: RoomId,
        competitors: &[UserId],
    ) -> Result<Vec<ConnectionId>, RoomError> {
        if self.rooms.contains_key(&room_id) {
            return Err(RoomError::AlreadyExists(room_id));
        }
        let [first, second] = competitors else {
            return Err(RoomError::InvalidCompetitors(format!(
                "expected 2 competitors, got {}",
                competitors.len()
            )));
        };
        if first == second {
            return Err(RoomError::InvalidCompetitors(format!(
                "{first} cannot duel themselves"
            )));
        }

        let users = [
            self.users.user(&first.into())?,
            self.users.user(&second.into())?,
        ];
        let connections: Vec<ConnectionId> = [first, second]
            .into_iter()
            .filter_map(|user_id| match self.users.connection_of(user_id) {
                Ok(connection) => Some(connection),
                Err(e) => {
                    tracing::warn!(%room_id, error = %e, "competitor has no connection");
                    None
                }
            })
            .collect();

        self.rooms
            .insert(room_id.clone(), Arc::new(Room::duel(room_id.clone(), users)));
        tracing::info!(%room_id, %first, %second, "room created");
        Ok(connections)
    }

    /// Removes the user from `room_id` and clears their assignment.
    async fn leave(
        &mut self,
        user_id: &UserId,
        room_id: &RoomId,
    ) -> Result<Role, RoomError> {
        let current = self.users.where_is(&user_id.into())?;
        let room = self.room(room_id)?;
        if !room.has(user_id).await {
            return Err(RoomError::NotInRoom(user_id.clone(), room_id.clone()));
        }
        if let Some(current) = current.filter(|current| current != room_id) {
            return Err(RoomError::InAnotherRoom {
                user_id: user_id.clone(),
                current,
                requested: room_id.clone(),
            });
        }

        let role = room.leave(user_id).await?;
        self.release(user_id);
        tracing::info!(%user_id, %room_id, %role, "user left room");
        Ok(role)
    }

    fn release(&mut self, user_id: &UserId) {
        if let Err(e) = self.users.release(user_id) {
            tracing::error!(%user_id, error = %e, "release of unknown user");
        }
    }
}

impl RoomFactory for Directory {
    fn create_duel(
        &mut self,
        room_id: RoomId,
        competitors: [UserId; 2],
    ) -> Result<Vec<ConnectionId>, RoomError> {
        self.create_room(room_id, &competitors)
    }
}

/// A completed join whose pairing notice, if any, has not been sent.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a matched pair is only notified by Coordinator::announce"]
pub struct Joined {
    pub info: JoinInfo,
    pub matched: Option<Match>,
}

/// Owns the registry, every room, and the matchmaking queue.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Coordinator<N: PairingNotifier> {
    directory: Mutex<Directory>,
    queue: Queue<N>,
}

impl<N: PairingNotifier> Coordinator<N> {
    /// Creates a coordinator with an empty registry and the matchmaking
    /// queue as its only room.
    pub fn new(notifier: N) -> Self {
        let queue_room = Arc::new(matchmaking_room());
        let mut rooms = HashMap::new();
        rooms.insert(queue_room.id().clone(), Arc::clone(&queue_room));

        Self {
            directory: Mutex::new(Directory {
                users: UserRegistry::new(),
                rooms,
            }),
            queue: Queue::with_room(queue_room, notifier),
        }
    }

    // -- Registration -----------------------------------------------------

    /// Records that `user` speaks through `connection`. A known identity
    /// keeps its room and cached info and only swaps handles.
    pub async fn register_or_reconnect(
        &self,
        user: User,
        connection: ConnectionId,
    ) -> bool {
        self.directory
            .lock()
            .await
            .users
            .register_or_reconnect(user, connection)
    }

    // -- Membership -------------------------------------------------------

    /// Seats a registered user in a room or in the matchmaking queue and
    /// sends any resulting matched notice before returning.
    ///
    /// # Errors
    /// As [`Coordinator::seat`].
    pub async fn join_room(
        &self,
        user_id: &UserId,
        room_id: &RoomId,
    ) -> Result<JoinInfo, RoomError> {
        let joined = self.seat(user_id, room_id).await?;
        if let Some(matched) = &joined.matched {
            self.announce(matched).await;
        }
        Ok(joined.info)
    }

    /// Seats a registered user in a room or in the matchmaking queue,
    /// leaving the matched notice to the caller.
    ///
    /// Room membership and the registry assignment are applied under one
    /// guard. If the join completes a pair in the queue, both paired users
    /// are released from it and their duel room is registered in the same
    /// step. Callers that reply to the joiner should do so before passing
    /// [`Joined::matched`] to [`Coordinator::announce`].
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]: no such room
    /// - [`RoomError::Registry`]: the user never registered
    /// - [`RoomError::InAnotherRoom`]: assigned to a different room
    /// - [`RoomError::AlreadyInRoom`]: already seated here
    pub async fn seat(
        &self,
        user_id: &UserId,
        room_id: &RoomId,
    ) -> Result<Joined, RoomError> {
        let mut directory = self.directory.lock().await;
        let room = directory.room(room_id)?;

        let current = directory.users.where_is(&user_id.into())?;
        if let Some(current) = current.filter(|current| current != room_id) {
            return Err(RoomError::InAnotherRoom {
                user_id: user_id.clone(),
                current,
                requested: room_id.clone(),
            });
        }

        let admission = room.join(user_id).await?;
        if let Err(e) =
            directory
                .users
                .assign(user_id, room_id.clone(), admission.info.clone())
        {
            tracing::error!(%user_id, error = %e, "assign failed after join");
        }
        tracing::info!(
            %user_id,
            %room_id,
            role = %admission.info.role(),
            "user joined room"
        );

        let matched = admission.pairing.and_then(|pairing| {
            for paired in &pairing {
                directory.release(paired);
            }
            self.queue.open_room(&mut *directory, pairing)
        });
        Ok(Joined {
            info: admission.info,
            matched,
        })
    }

    /// Sends the matched notice for a room opened by [`Coordinator::seat`].
    pub async fn announce(&self, matched: &Match) {
        self.queue.announce(matched).await;
    }

    /// Removes a user from a room.
    ///
    /// # Errors
    /// - [`RoomError::Registry`]: the user never registered
    /// - [`RoomError::NotFound`]: no such room
    /// - [`RoomError::NotInRoom`]: no seat held here
    /// - [`RoomError::InAnotherRoom`]: recorded in a different room
    pub async fn leave_room(
        &self,
        user_id: &UserId,
        room_id: &RoomId,
    ) -> Result<Role, RoomError> {
        self.directory.lock().await.leave(user_id, room_id).await
    }

    /// Handles a closed connection: if the handle still speaks for a user
    /// who is in a room, that user leaves it.
    ///
    /// Never fails. Unknown or stale handles, and users in no room, are
    /// logged and ignored, so calling this twice is harmless.
    pub async fn disconnect(&self, connection: ConnectionId) -> Option<Departure> {
        let mut directory = self.directory.lock().await;

        let user_id = match directory.users.identify(&connection.into()) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::debug!(%connection, error = %e, "disconnect from unknown handle");
                return None;
            }
        };
        let Ok(Some(room_id)) = directory.users.where_is(&(&user_id).into())
        else {
            tracing::debug!(%connection, %user_id, "disconnected user was in no room");
            return None;
        };

        match directory.leave(&user_id, &room_id).await {
            Ok(role) => {
                tracing::info!(%connection, %user_id, %room_id, "removed on disconnect");
                Some(Departure {
                    user_id,
                    room_id,
                    role,
                })
            }
            Err(e) => {
                tracing::warn!(
                    %connection,
                    %user_id,
                    %room_id,
                    error = %e,
                    "could not remove disconnected user"
                );
                None
            }
        }
    }

    // -- Room lifecycle ---------------------------------------------------

    /// Creates a duel room for exactly two distinct registered users.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyExists`]: the id is taken
    /// - [`RoomError::InvalidCompetitors`]: not exactly two distinct ids
    /// - [`RoomError::Registry`]: a competitor never registered
    pub async fn make_room(
        &self,
        room_id: RoomId,
        competitors: &[UserId],
    ) -> Result<(), RoomError> {
        self.directory
            .lock()
            .await
            .create_room(room_id, competitors)
            .map(|_| ())
    }

    /// Deletes a room nobody occupies.
    ///
    /// # Errors
    /// - [`RoomError::Protected`]: the matchmaking queue
    /// - [`RoomError::NotFound`]: no such room
    /// - [`RoomError::NotEmpty`]: an active competitor or a spectator
    ///   remains
    pub async fn delete_room(&self, room_id: &RoomId) -> Result<(), RoomError> {
        if room_id.is_matchmaking() {
            return Err(RoomError::Protected(room_id.clone()));
        }
        let mut directory = self.directory.lock().await;
        let room = directory.room(room_id)?;

        let conditions = room.delete_conditions().await;
        if !conditions.is_satisfied() {
            tracing::warn!(%room_id, ?conditions, "refusing to delete occupied room");
            return Err(RoomError::NotEmpty(room_id.clone()));
        }

        directory.rooms.remove(room_id);
        tracing::info!(%room_id, "room deleted");
        Ok(())
    }

    // -- Lookups ----------------------------------------------------------

    pub async fn get_user_id(
        &self,
        connection: ConnectionId,
    ) -> Result<UserId, RoomError> {
        Ok(self.directory.lock().await.users.identify(&connection.into())?)
    }

    pub async fn get_connection_id(
        &self,
        user_id: &UserId,
    ) -> Result<ConnectionId, RoomError> {
        Ok(self.directory.lock().await.users.connection_of(user_id)?)
    }

    /// The room (or queue) the user currently occupies.
    pub async fn where_is(
        &self,
        who: impl Into<UserRef>,
    ) -> Result<Option<RoomId>, RoomError> {
        Ok(self.directory.lock().await.users.where_is(&who.into())?)
    }

    /// The last join result handed to the user. Survives leaving.
    pub async fn get_user_room_info(
        &self,
        who: impl Into<UserRef>,
    ) -> Result<Option<JoinInfo>, RoomError> {
        Ok(self.directory.lock().await.users.cached_info(&who.into())?)
    }

    pub async fn get_user(&self, who: impl Into<UserRef>) -> Result<User, RoomError> {
        Ok(self.directory.lock().await.users.user(&who.into())?)
    }

    pub async fn has_user(&self, user_id: &UserId) -> bool {
        self.directory.lock().await.users.has_user(user_id)
    }

    pub async fn has_room(&self, room_id: &RoomId) -> bool {
        self.directory.lock().await.rooms.contains_key(room_id)
    }

    /// Number of rooms, the matchmaking queue included.
    pub async fn room_count(&self) -> usize {
        self.directory.lock().await.rooms.len()
    }

    /// Number of users waiting in the matchmaking queue.
    pub async fn queue_len(&self) -> usize {
        self.queue.len().await
    }

    /// Snapshot of a room as seen by a member in `role`.
    pub async fn room_info(
        &self,
        room_id: &RoomId,
        role: Role,
    ) -> Result<UserRoomInfo, RoomError> {
        let room = self.directory.lock().await.room(room_id)?;
        Ok(room.info(role).await)
    }

    pub async fn delete_conditions(
        &self,
        room_id: &RoomId,
    ) -> Result<DeleteConditions, RoomError> {
        let room = self.directory.lock().await.room(room_id)?;
        Ok(room.delete_conditions().await)
    }

    /// One of the room's two competitor records.
    pub async fn competitor(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Competitor, RoomError> {
        let room = self.directory.lock().await.room(room_id)?;
        room.competitor(user_id)
            .await
            .ok_or_else(|| RoomError::NotCompetitor(user_id.clone(), room_id.clone()))
    }

    /// Users holding a seat in the room: active competitors, then
    /// spectators in arrival order.
    pub async fn room_members(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<UserId>, RoomError> {
        let room = self.directory.lock().await.room(room_id)?;
        Ok(room.members().await)
    }

    /// Connection handles of everyone seated in the room, for broadcast.
    pub async fn room_connections(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<ConnectionId>, RoomError> {
        let directory = self.directory.lock().await;
        let room = directory.room(room_id)?;

        let mut seen = HashSet::new();
        let mut connections = Vec::new();
        for user_id in room.members().await {
            match directory.users.connection_of(&user_id) {
                Ok(connection) if seen.insert(connection) => {
                    connections.push(connection)
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%room_id, error = %e, "member has no connection"),
            }
        }
        Ok(connections)
    }
}
