//! The matchmaking queue.
//!
//! The queue is a [`Room`] under the reserved id `matchmaking` with the
//! [`FifoPairing`] policy. The pairing itself is popped under the room
//! lock by the policy. [`Queue::open_room`] then mints a fresh room and
//! lets the [`RoomFactory`] register it, still under the caller's
//! directory lock, so a paired user is never free to queue again before
//! their room exists. [`Queue::announce`] tells both users through the
//! [`PairingNotifier`] once every lock has been released.
//!
//! ```text
//! join(a) ─→ [a]
//! join(b) ─→ [a, b] ─pop─→ [] ──open_room──→ create_duel(r, [a, b])
//!                                                  │
//!                                      (locks dropped)
//!                                                  │
//!                                      notify_matched(r, [conn_a, conn_b])
//! ```

use std::future::Future;
use std::sync::Arc;

use duelroom_protocol::{RoomId, UserId};
use duelroom_transport::ConnectionId;
use rand::Rng;

use crate::policy::FifoPairing;
use crate::{Room, RoomError};

/// Registers freshly paired duel rooms.
///
/// Synchronous: the coordinator implements it on its locked directory.
pub trait RoomFactory {
    /// Creates a duel room with the two users as competitors and returns
    /// the connection handles currently speaking for them.
    ///
    /// # Errors
    /// Whatever the room directory reports: an id clash or a competitor
    /// that is not registered.
    fn create_duel(
        &mut self,
        room_id: RoomId,
        competitors: [UserId; 2],
    ) -> Result<Vec<ConnectionId>, RoomError>;
}

/// Delivers the "you have been matched" notice.
///
/// Implemented by the transport layer. Called with no coordinator lock
/// held, so implementations may take their own locks freely.
pub trait PairingNotifier: Send + Sync + 'static {
    fn notify_matched(
        &self,
        room_id: &RoomId,
        connections: &[ConnectionId],
    ) -> impl Future<Output = ()> + Send;
}

/// A duel room opened for a popped pair whose notice is still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub room_id: RoomId,
    pub connections: Vec<ConnectionId>,
}

/// FIFO matchmaking queue.
pub struct Queue<N> {
    room: Arc<Room>,
    notifier: N,
}

impl<N: PairingNotifier> Queue<N> {
    pub fn new(notifier: N) -> Self {
        Self::with_room(Arc::new(matchmaking_room()), notifier)
    }

    /// Wraps an existing queue room, so a directory can hold the same
    /// room under its reserved id.
    pub(crate) fn with_room(room: Arc<Room>, notifier: N) -> Self {
        Self { room, notifier }
    }

    /// The room holding waiting users.
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    /// Number of users currently waiting.
    pub async fn len(&self) -> usize {
        self.room.spectator_count().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Turns a popped pair into a registered duel room.
    ///
    /// Returns `None` if the factory refused. A refusal is logged; the
    /// pair is not put back.
    pub fn open_room(
        &self,
        factory: &mut impl RoomFactory,
        pairing: [UserId; 2],
    ) -> Option<Match> {
        let room_id = mint_room_id();
        let [first, second] = &pairing;
        tracing::info!(%room_id, %first, %second, "creating room for pair");

        match factory.create_duel(room_id.clone(), pairing) {
            Ok(connections) => Some(Match {
                room_id,
                connections,
            }),
            Err(e) => {
                tracing::error!(%room_id, error = %e, "failed to create paired room");
                None
            }
        }
    }

    /// Sends the matched notice for an opened room.
    pub async fn announce(&self, matched: &Match) {
        self.notifier
            .notify_matched(&matched.room_id, &matched.connections)
            .await;
    }
}

/// An empty room under the reserved id, paired first-come first-served.
pub(crate) fn matchmaking_room() -> Room {
    Room::with_policy(RoomId::matchmaking(), Vec::new(), FifoPairing)
}

/// A fresh room id: 128 random bits as lowercase hex.
fn mint_room_id() -> RoomId {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    RoomId::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    #[derive(Default)]
    struct RecordingFactory {
        created: Vec<(RoomId, [UserId; 2])>,
        refuse: bool,
    }

    impl RoomFactory for RecordingFactory {
        fn create_duel(
            &mut self,
            room_id: RoomId,
            competitors: [UserId; 2],
        ) -> Result<Vec<ConnectionId>, RoomError> {
            if self.refuse {
                return Err(RoomError::AlreadyExists(room_id));
            }
            self.created.push((room_id, competitors));
            Ok(vec![ConnectionId::new(1), ConnectionId::new(2)])
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<(RoomId, Vec<ConnectionId>)>>,
    }

    impl PairingNotifier for Arc<RecordingNotifier> {
        async fn notify_matched(
            &self,
            room_id: &RoomId,
            connections: &[ConnectionId],
        ) {
            self.notices
                .lock()
                .unwrap()
                .push((room_id.clone(), connections.to_vec()));
        }
    }

    fn uid(id: &str) -> UserId {
        UserId::from(id)
    }

    // =====================================================================
    // open_room() / announce()
    // =====================================================================

    #[test]
    fn test_open_room_creates_room_without_notifying() {
        let mut factory = RecordingFactory::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let queue = Queue::new(Arc::clone(&notifier));

        let matched = queue.open_room(&mut factory, [uid("a"), uid("b")]).unwrap();

        assert_eq!(
            factory.created,
            vec![(matched.room_id.clone(), [uid("a"), uid("b")])]
        );
        assert_eq!(
            matched.connections,
            vec![ConnectionId::new(1), ConnectionId::new(2)]
        );
        assert!(notifier.notices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_announce_notifies_both_connections() {
        let mut factory = RecordingFactory::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let queue = Queue::new(Arc::clone(&notifier));
        let matched = queue.open_room(&mut factory, [uid("a"), uid("b")]).unwrap();

        queue.announce(&matched).await;

        let notices = notifier.notices.lock().unwrap().clone();
        assert_eq!(
            notices,
            vec![(
                matched.room_id,
                vec![ConnectionId::new(1), ConnectionId::new(2)]
            )]
        );
    }

    #[test]
    fn test_open_room_refused_returns_none() {
        let mut factory = RecordingFactory {
            refuse: true,
            ..Default::default()
        };
        let queue = Queue::new(Arc::new(RecordingNotifier::default()));

        assert!(queue.open_room(&mut factory, [uid("a"), uid("b")]).is_none());
        assert!(factory.created.is_empty());
    }

    #[tokio::test]
    async fn test_new_queue_is_empty_matchmaking_room() {
        let queue = Queue::new(Arc::new(RecordingNotifier::default()));

        assert!(queue.room().id().is_matchmaking());
        assert!(queue.is_empty().await);
    }

    #[test]
    fn test_mint_room_id_is_32_hex_chars_and_unique() {
        let a = mint_room_id();
        let b = mint_room_id();

        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
