//! User registry for duelroom.
//!
//! Tracks, for every user identity seen so far:
//!
//! 1. **Connection**: which [`ConnectionId`](duelroom_transport::ConnectionId)
//!    currently speaks for them (swapped on reconnect)
//! 2. **Location**: which room or queue they occupy, if any
//! 3. **Cached info**: the last join result handed back to them
//!
//! ```text
//! Coordinator (above)  ← guards the registry with its directory lock
//!     ↕
//! Registry (this crate)
//!     ↕
//! Protocol / Transport (below)  ← UserId, RoomId, ConnectionId
//! ```

mod error;
mod registry;
mod state;

pub use error::RegistryError;
pub use registry::UserRegistry;
pub use state::{UserRef, UserState};
