//! A single live room.

use std::time::{Duration, Instant};

use arena_protocol::RoomCode;
use arena_transport::ConnectionId;

/// A live room: its code, the sockets bound to it, and when it last
/// changed.
///
/// Members are kept in join order. Seat and turn assignment downstream
/// rely on that order, so a `Vec` with a membership check is used rather
/// than a hash set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    code: RoomCode,
    members: Vec<ConnectionId>,
    created_at: Instant,
    last_membership_change: Instant,
}

impl Room {
    pub(crate) fn new(code: RoomCode, now: Instant) -> Self {
        Self {
            code,
            members: Vec::new(),
            created_at: now,
            last_membership_change: now,
        }
    }

    /// The room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Members in the order they joined.
    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    /// Returns `true` if `conn` is bound to this room.
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.members.contains(&conn)
    }

    /// Number of bound sockets.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no socket is bound.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// When the room was allocated.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When a member was last added or removed (or the allocation time).
    pub fn last_membership_change(&self) -> Instant {
        self.last_membership_change
    }

    /// An empty room whose membership hasn't changed for longer than
    /// `idle_timeout` is eligible for expiry.
    pub fn is_idle(&self, now: Instant, idle_timeout: Duration) -> bool {
        self.members.is_empty()
            && now.saturating_duration_since(self.last_membership_change)
                > idle_timeout
    }

    /// Adds a member. Returns `false` (and changes nothing) if already
    /// present.
    pub(crate) fn add(&mut self, conn: ConnectionId, now: Instant) -> bool {
        if self.contains(conn) {
            return false;
        }
        self.members.push(conn);
        self.last_membership_change = now;
        true
    }

    /// Removes a member. Returns `false` if it wasn't present.
    pub(crate) fn remove(&mut self, conn: ConnectionId, now: Instant) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != conn);
        if self.members.len() == before {
            return false;
        }
        self.last_membership_change = now;
        true
    }
}
