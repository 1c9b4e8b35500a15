//! The room registry: the single source of truth for which codes are live.
//!
//! Every operation takes the current time as an argument instead of
//! reading the clock itself. The server passes `Instant::now()`; tests
//! pass synthetic instants and exercise expiry without sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use arena_protocol::RoomCode;
use arena_transport::ConnectionId;

use crate::{Room, RoomError};

/// Live rooms keyed by code.
///
/// ## Lifecycle
///
/// ```text
/// allocate() ──→ add_member()* ──→ remove_member()* ──→ expire_idle()
///                                                  └──→ close()
/// ```
///
/// A code denotes at most one live room. Once a room is closed or
/// expired its code is free again.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room under `code`.
    ///
    /// # Errors
    /// [`RoomError::CodeCollision`] if `code` is already live.
    pub fn allocate(
        &mut self,
        code: RoomCode,
        now: Instant,
    ) -> Result<&Room, RoomError> {
        use std::collections::hash_map::Entry;

        match self.rooms.entry(code) {
            Entry::Occupied(entry) => {
                Err(RoomError::CodeCollision(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                let room = Room::new(entry.key().clone(), now);
                tracing::info!(room_code = %entry.key(), "room allocated");
                Ok(entry.insert(room))
            }
        }
    }

    /// Looks up a live room.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no live room has this code.
    pub fn get(&self, code: &RoomCode) -> Result<&Room, RoomError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Returns `true` if `code` denotes a live room.
    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Adds `conn` to the room's member set.
    ///
    /// Idempotent: adding a connection that is already a member is a
    /// no-op, not an error, and does not reset the idle clock.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room is not live.
    pub fn add_member(
        &mut self,
        code: &RoomCode,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<&Room, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        if room.add(conn, now) {
            tracing::info!(
                room_code = %code,
                conn_id = %conn,
                members = room.len(),
                "member added"
            );
        }
        Ok(room)
    }

    /// Removes `conn` from the room. Returns whether it was a member.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room is not live.
    pub fn remove_member(
        &mut self,
        code: &RoomCode,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<bool, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        let removed = room.remove(conn, now);
        if removed {
            tracing::info!(
                room_code = %code,
                conn_id = %conn,
                members = room.len(),
                "member removed"
            );
        }
        Ok(removed)
    }

    /// Explicitly closes a room, returning its final state.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room is not live.
    pub fn close(&mut self, code: &RoomCode) -> Result<Room, RoomError> {
        let room = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        tracing::info!(room_code = %code, "room closed");
        Ok(room)
    }

    /// Removes every empty room whose membership last changed more than
    /// `idle_timeout` before `now`. Returns the freed codes.
    pub fn expire_idle(
        &mut self,
        now: Instant,
        idle_timeout: Duration,
    ) -> Vec<RoomCode> {
        let mut expired = Vec::new();
        self.rooms.retain(|code, room| {
            if room.is_idle(now, idle_timeout) {
                expired.push(code.clone());
                false
            } else {
                true
            }
        });

        for code in &expired {
            tracing::info!(room_code = %code, "idle room expired");
        }
        expired
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if there are no live rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Codes of all live rooms, in no particular order.
    pub fn codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }
}
