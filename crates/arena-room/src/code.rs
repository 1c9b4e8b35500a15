//! Room-code generation.

use arena_protocol::RoomCode;
use rand::Rng;

use crate::{CodeConfig, RoomError, RoomRegistry};

/// Produces short random codes that are not currently live.
///
/// The generator only *proposes* a free code; it never reserves it. The
/// caller must allocate it against the same registry while still holding
/// whatever guard it used for the check, otherwise two callers could be
/// handed the same code.
#[derive(Debug, Clone)]
pub struct RoomCodeGenerator {
    alphabet: Vec<u8>,
    length: usize,
    max_attempts: u32,
}

impl RoomCodeGenerator {
    /// Builds a generator from a validated config.
    ///
    /// # Errors
    /// [`RoomError::InvalidConfig`] if the config can't produce valid codes.
    pub fn new(config: &CodeConfig) -> Result<Self, RoomError> {
        config.validate()?;
        Ok(Self {
            alphabet: config.alphabet.as_bytes().to_vec(),
            length: config.length,
            max_attempts: config.max_attempts,
        })
    }

    /// Returns a code that is not live in `registry`.
    ///
    /// # Errors
    /// [`RoomError::ExhaustedRetries`] once `max_attempts` random
    /// candidates have all collided.
    pub fn next(&self, registry: &RoomRegistry) -> Result<RoomCode, RoomError> {
        let mut rng = rand::rng();

        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate(&mut rng)?;
            if !registry.contains(&candidate) {
                return Ok(candidate);
            }
            tracing::debug!(%candidate, attempt, "room code collision");
        }

        tracing::warn!(
            attempts = self.max_attempts,
            live_rooms = registry.len(),
            "room code space exhausted"
        );
        Err(RoomError::ExhaustedRetries {
            attempts: self.max_attempts,
        })
    }

    fn candidate(&self, rng: &mut impl Rng) -> Result<RoomCode, RoomError> {
        let raw: String = (0..self.length)
            .map(|_| {
                let idx = rng.random_range(0..self.alphabet.len());
                char::from(self.alphabet[idx])
            })
            .collect();
        RoomCode::parse(&raw)
            .map_err(|e| RoomError::InvalidConfig(e.to_string()))
    }
}

impl Default for RoomCodeGenerator {
    fn default() -> Self {
        let config = CodeConfig::default();
        Self {
            alphabet: config.alphabet.into_bytes(),
            length: config.length,
            max_attempts: config.max_attempts,
        }
    }
}
