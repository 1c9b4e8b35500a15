//! Unified error type for the Arena server.

use arena_entitlement::{EntitlementError, LedgerError};
use arena_protocol::ProtocolError;
use arena_room::RoomError;
use arena_session::SessionError;
use arena_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad identifier).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (room creation).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Bad input at the entitlement boundary.
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    /// The purchase ledger could not be used.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Startup configuration is missing or malformed. Fatal.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or serving the HTTP listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A configuration problem found at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A variable is set but can't be used.
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
