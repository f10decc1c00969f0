//! # duelroom
//!
//! Real-time duel matchmaking and room coordination over WebSockets.
//!
//! Clients connect, identify themselves with a profile, and either join
//! the matchmaking queue or a named room. The queue pairs users first
//! come, first served and tells both of them which room was made for
//! them; rooms track two competitor seats plus any number of spectators
//! and relay chat-style messages to everyone seated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelroom::prelude::*;
//!
//! # async fn start() -> Result<(), DuelError> {
//! let server = DuelServer::builder()
//!     .config(ServerConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod outbox;
mod server;

pub use config::ServerConfig;
pub use error::DuelError;
pub use outbox::{EventSender, Outbox};
pub use server::{DuelServer, DuelServerBuilder};

pub mod prelude {
    //! Everything needed to run a server and talk to its coordinator.

    pub use crate::{DuelError, DuelServer, DuelServerBuilder, Outbox, ServerConfig};
    pub use duelroom_protocol::{
        ClientEvent, Envelope, JoinInfo, MatchStatus, QueueInfo, Role,
        RoomId, RoomMessage, ServerEvent, User, UserId, UserRoomInfo,
    };
    pub use duelroom_room::{Coordinator, RoomError};
    pub use duelroom_transport::ConnectionId;
}
