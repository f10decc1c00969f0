//! Error types for the registry.

use duelroom_protocol::UserId;
use duelroom_transport::ConnectionId;

/// Lookups that could not be resolved to a registered user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No state exists for this user id.
    #[error("user {0} is not registered")]
    UnknownUser(UserId),

    /// No user currently owns this connection handle. Either the
    /// connection never joined anything, or its user has since
    /// reconnected under a new handle.
    #[error("no user is attached to {0}")]
    UnknownConnection(ConnectionId),

    /// The user is registered but their handle was taken over by another
    /// user and they have not reconnected since.
    #[error("user {0} has no live connection")]
    Detached(UserId),
}
