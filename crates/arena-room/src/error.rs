//! Error types for the room layer.

use arena_protocol::RoomCode;

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The code already denotes a live room.
    #[error("room code {0} is already in use")]
    CodeCollision(RoomCode),

    /// No live room has this code.
    ///
    /// Expected in normal operation (typos, expired rooms); callers
    /// turn it into a negative answer, not a fault.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The generator could not find a free code within its retry bound.
    #[error("no free room code after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    /// The generator was configured with an alphabet or length that
    /// cannot produce valid codes.
    #[error("invalid code configuration: {0}")]
    InvalidConfig(String),
}
