//! Error types for the session layer.

use arena_room::RoomError;

/// Errors surfaced by [`SessionGateway`](crate::SessionGateway).
///
/// Only genuine faults end up here. An unknown room code on join or bind
/// is an expected user mistake and is reported through return values
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A room-layer failure, most often
    /// [`RoomError::ExhaustedRetries`] from `create_room`.
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl SessionError {
    /// Returns `true` if the client should simply try again
    /// ("try again" failures rather than bugs).
    /// The room named in the request does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Room(RoomError::NotFound(_)))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Room(RoomError::ExhaustedRetries { .. })
                | Self::Room(RoomError::CodeCollision(_))
        )
    }
}
