//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event name,
    /// missing fields, or an identifier that did not parse.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The string is not a usable room code.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    /// The string is not a `0x`-prefixed 20-byte hex address.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),
}
