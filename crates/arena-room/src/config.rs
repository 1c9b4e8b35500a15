//! Room-code configuration.

use arena_protocol::RoomCode;

use crate::RoomError;

/// Shape of generated room codes.
///
/// The defaults give 36^6 ≈ 2.2 billion codes, which keeps the chance of
/// a collision among a few thousand live rooms negligible while still
/// being easy to read out loud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeConfig {
    /// Characters a code is drawn from. Upper-case ASCII alphanumerics.
    pub alphabet: String,

    /// Number of characters per code.
    pub length: usize,

    /// How many candidates to try before giving up with
    /// [`RoomError::ExhaustedRetries`].
    pub max_attempts: u32,
}

impl CodeConfig {
    /// Default alphabet: `A–Z` then `0–9`.
    pub const DEFAULT_ALPHABET: &'static str =
        "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Checks that every code this config can produce is a valid,
    /// canonical [`RoomCode`].
    ///
    /// Lower-case letters are rejected rather than folded: two alphabet
    /// entries that differ only in case would silently shrink the code
    /// space.
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.length == 0 || self.length > RoomCode::MAX_LEN {
            return Err(RoomError::InvalidConfig(format!(
                "length must be 1..={}, got {}",
                RoomCode::MAX_LEN,
                self.length
            )));
        }
        if self.alphabet.is_empty() {
            return Err(RoomError::InvalidConfig("alphabet is empty".into()));
        }
        if !self
            .alphabet
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(RoomError::InvalidConfig(format!(
                "alphabet must be upper-case ASCII alphanumerics, got {:?}",
                self.alphabet
            )));
        }
        if self.max_attempts == 0 {
            return Err(RoomError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            alphabet: Self::DEFAULT_ALPHABET.to_string(),
            length: 6,
            max_attempts: 10,
        }
    }
}
